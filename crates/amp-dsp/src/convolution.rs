//! Uniform partitioned convolution engine
//!
//! One engine convolves one channel against a [`PartitionedIr`]:
//! - Input block zero-padded to `fft_size = 2 * block_size`, transformed
//!   and pushed into the frequency-domain delay line
//! - Spectral multiply-accumulate of every partition against the matching
//!   delayed input spectrum
//! - Inverse transform, first half emitted (plus the carried overlap),
//!   second half carried into the next block
//!
//! Per-block cost is `O(fft_size * partition_count)` and independent of
//! where in the IR the energy sits. Output is available in the same call,
//! so the engine adds no latency.

use std::sync::Arc;

use rustfft::num_complex::Complex;

use amp_core::{AmpError, AmpResult, Sample};

use crate::fdl::FrequencyDelayLine;
use crate::fft::{complex_multiply_accumulate, FrequencyTransform};
use crate::partition::PartitionedIr;

/// Single-channel streaming convolution engine
#[derive(Debug)]
pub struct PartitionedConvolver {
    ir: Arc<PartitionedIr>,
    fft: FrequencyTransform,
    fdl: FrequencyDelayLine,
    /// Tail of the previous block's linear convolution (`block_size` samples)
    overlap: Vec<Sample>,
    /// Time-domain work buffer (`fft_size` samples)
    time: Vec<Sample>,
    /// Spectrum of the current input block
    input_spectrum: Vec<Complex<Sample>>,
    /// Accumulated output spectrum
    output_spectrum: Vec<Complex<Sample>>,
    /// Set once a short block has been processed
    ended: bool,
}

impl PartitionedConvolver {
    pub fn new(ir: Arc<PartitionedIr>) -> AmpResult<Self> {
        let fft = FrequencyTransform::new(ir.fft_size())?;
        let fdl = FrequencyDelayLine::new(ir.partition_count(), ir.spectrum_len());

        Ok(Self {
            overlap: vec![0.0; ir.block_size()],
            time: fft.make_time_buffer(),
            input_spectrum: fft.make_spectrum_buffer(),
            output_spectrum: fft.make_spectrum_buffer(),
            fft,
            fdl,
            ir,
            ended: false,
        })
    }

    /// Convolve one block.
    ///
    /// `input` may hold at most `block_size` samples and `output` must have
    /// the same length. A block shorter than `block_size` is the end of the
    /// stream: it is zero-padded for the transform, and any later call
    /// fails with [`AmpError::StreamEnded`] until [`reset`](Self::reset).
    pub fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> AmpResult<()> {
        let block_size = self.ir.block_size();
        let n = input.len();

        if self.ended {
            return Err(AmpError::StreamEnded);
        }
        if n > block_size {
            return Err(AmpError::BlockTooLarge {
                max: block_size,
                got: n,
            });
        }
        if output.len() != n {
            return Err(AmpError::InvalidParam(format!(
                "output length {} does not match input length {}",
                output.len(),
                n
            )));
        }
        if n == 0 {
            return Ok(());
        }

        // Transform the zero-padded input and make it the newest FDL entry
        self.time.fill(0.0);
        self.time[..n].copy_from_slice(input);
        self.fft.forward(&mut self.time, &mut self.input_spectrum)?;
        self.fdl.push(&self.input_spectrum);

        // Y = sum_p FDL[p] * H[p]
        self.output_spectrum.fill(Complex::new(0.0, 0.0));
        for (p, partition) in self.ir.iter().enumerate() {
            complex_multiply_accumulate(&mut self.output_spectrum, self.fdl.at(p), partition);
        }

        self.fft.inverse(&mut self.output_spectrum, &mut self.time)?;

        for (i, out) in output.iter_mut().enumerate() {
            *out = self.time[i] + self.overlap[i];
        }
        self.overlap
            .copy_from_slice(&self.time[block_size..2 * block_size]);

        if n < block_size {
            log::debug!("short block of {n} samples ends the convolution stream");
            self.ended = true;
        }
        Ok(())
    }

    /// Convolve one block into a newly allocated output
    pub fn apply(&mut self, input: &[Sample]) -> AmpResult<Vec<Sample>> {
        let mut output = vec![0.0; input.len()];
        self.process(input, &mut output)?;
        Ok(output)
    }

    /// Carried tail of the previous block
    #[inline]
    pub fn overlap(&self) -> &[Sample] {
        &self.overlap
    }

    /// Clear all stream state
    pub fn reset(&mut self) {
        self.fdl.reset();
        self.overlap.fill(0.0);
        self.ended = false;
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.ir.block_size()
    }

    #[inline]
    pub fn partition_count(&self) -> usize {
        self.ir.partition_count()
    }

    /// Length of the frequency-domain delay line
    #[inline]
    pub fn fdl_len(&self) -> usize {
        self.fdl.len()
    }

    #[inline]
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Processing latency in samples
    #[inline]
    pub fn latency(&self) -> usize {
        0
    }

    /// Samples of output still pending after the last non-zero input
    #[inline]
    pub fn tail_len(&self) -> usize {
        self.ir.ir_len().saturating_sub(1)
    }

    pub fn impulse_response(&self) -> &Arc<PartitionedIr> {
        &self.ir
    }
}
