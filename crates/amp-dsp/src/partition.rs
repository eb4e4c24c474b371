//! Impulse response partitioner
//!
//! Splits an IR into `block_size` time segments, zero-pads each to
//! `fft_size = 2 * block_size` and stores its spectrum. Partition 0 is the
//! earliest segment of the IR.

use rustfft::num_complex::Complex;

use amp_core::{validate_block_size, AmpError, AmpResult, Sample};

use crate::fft::FrequencyTransform;

/// Frequency-domain IR segments for uniform partitioned convolution.
///
/// Immutable once built; shared across channel engines through `Arc`.
#[derive(Debug, Clone)]
pub struct PartitionedIr {
    /// One half-spectrum per partition
    partitions: Vec<Vec<Complex<Sample>>>,
    ir_len: usize,
    block_size: usize,
    fft_size: usize,
}

impl PartitionedIr {
    pub fn new(ir: &[Sample], block_size: usize) -> AmpResult<Self> {
        let block_size = validate_block_size(block_size)?;
        if ir.is_empty() {
            return Err(AmpError::EmptyImpulseResponse);
        }

        let fft_size = 2 * block_size;
        let mut fft = FrequencyTransform::new(fft_size)?;
        let mut time = fft.make_time_buffer();

        let partitions = ir
            .chunks(block_size)
            .map(|segment| {
                time.fill(0.0);
                time[..segment.len()].copy_from_slice(segment);
                let mut spectrum = fft.make_spectrum_buffer();
                fft.forward(&mut time, &mut spectrum)?;
                Ok(spectrum)
            })
            .collect::<AmpResult<Vec<_>>>()?;

        log::debug!(
            "partitioned IR: {} samples -> {} partitions of {} (fft size {})",
            ir.len(),
            partitions.len(),
            block_size,
            fft_size
        );

        Ok(Self {
            partitions,
            ir_len: ir.len(),
            block_size,
            fft_size,
        })
    }

    #[inline]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Spectrum of partition `p`
    #[inline]
    pub fn partition(&self, p: usize) -> &[Complex<Sample>] {
        &self.partitions[p]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Complex<Sample>]> {
        self.partitions.iter().map(Vec::as_slice)
    }

    #[inline]
    pub fn ir_len(&self) -> usize {
        self.ir_len
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Bins per partition spectrum
    #[inline]
    pub fn spectrum_len(&self) -> usize {
        crate::fft::spectrum_len(self.fft_size)
    }
}
