//! Real-input FFT wrapper
//!
//! Every signal in the amp chain is real, so transforms operate on the
//! half spectrum (`fft_size / 2 + 1` bins). The negative-frequency half
//! is implied by Hermitian symmetry.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use amp_core::{AmpError, AmpResult, Sample};

/// Number of half-spectrum bins for a real transform of `fft_size`
#[inline]
pub fn spectrum_len(fft_size: usize) -> usize {
    fft_size / 2 + 1
}

/// Forward/inverse real FFT pair of a fixed size with owned scratch space
pub struct FrequencyTransform {
    fft_size: usize,
    forward: Arc<dyn RealToComplex<Sample>>,
    inverse: Arc<dyn ComplexToReal<Sample>>,
    forward_scratch: Vec<Complex<Sample>>,
    inverse_scratch: Vec<Complex<Sample>>,
}

impl std::fmt::Debug for FrequencyTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyTransform")
            .field("fft_size", &self.fft_size)
            .finish()
    }
}

impl FrequencyTransform {
    pub fn new(fft_size: usize) -> AmpResult<Self> {
        if fft_size == 0 {
            return Err(AmpError::Dsp("FFT size must be non-zero".to_string()));
        }
        let mut planner = RealFftPlanner::<Sample>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let forward_scratch = forward.make_scratch_vec();
        let inverse_scratch = inverse.make_scratch_vec();

        Ok(Self {
            fft_size,
            forward,
            inverse,
            forward_scratch,
            inverse_scratch,
        })
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    #[inline]
    pub fn spectrum_len(&self) -> usize {
        spectrum_len(self.fft_size)
    }

    /// Zeroed time-domain buffer of `fft_size` samples
    pub fn make_time_buffer(&self) -> Vec<Sample> {
        vec![0.0; self.fft_size]
    }

    /// Zeroed spectrum buffer of `spectrum_len` bins
    pub fn make_spectrum_buffer(&self) -> Vec<Complex<Sample>> {
        vec![Complex::new(0.0, 0.0); self.spectrum_len()]
    }

    /// Forward transform. `time` is used as working memory and is left
    /// in an unspecified state.
    pub fn forward(
        &mut self,
        time: &mut [Sample],
        spectrum: &mut [Complex<Sample>],
    ) -> AmpResult<()> {
        self.forward
            .process_with_scratch(time, spectrum, &mut self.forward_scratch)
            .map_err(|e| AmpError::Dsp(format!("forward FFT failed: {e}")))
    }

    /// Inverse transform, normalized by `1 / fft_size`. `spectrum` is used
    /// as working memory.
    pub fn inverse(
        &mut self,
        spectrum: &mut [Complex<Sample>],
        time: &mut [Sample],
    ) -> AmpResult<()> {
        // DC and Nyquist bins of a real signal carry no imaginary part
        if let Some(dc) = spectrum.first_mut() {
            dc.im = 0.0;
        }
        if self.fft_size % 2 == 0 {
            if let Some(nyquist) = spectrum.last_mut() {
                nyquist.im = 0.0;
            }
        }

        self.inverse
            .process_with_scratch(spectrum, time, &mut self.inverse_scratch)
            .map_err(|e| AmpError::Dsp(format!("inverse FFT failed: {e}")))?;

        let norm = 1.0 / self.fft_size as Sample;
        for s in time.iter_mut() {
            *s *= norm;
        }
        Ok(())
    }
}

/// `result[k] += a[k] * b[k]` over complex bins
pub fn complex_multiply_accumulate(
    result: &mut [Complex<Sample>],
    a: &[Complex<Sample>],
    b: &[Complex<Sample>],
) {
    debug_assert_eq!(result.len(), a.len());
    debug_assert_eq!(result.len(), b.len());
    for ((r, x), h) in result.iter_mut().zip(a).zip(b) {
        r.re += x.re * h.re - x.im * h.im;
        r.im += x.re * h.im + x.im * h.re;
    }
}
