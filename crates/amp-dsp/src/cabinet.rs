//! Speaker cabinet simulation
//!
//! Wraps one [`PartitionedConvolver`] per channel behind the [`Effect`]
//! interface. A mono IR is partitioned once and shared by every channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use amp_core::{
    frame_count, AmpError, AmpResult, ChannelLayout, ImpulseResponse, Sample,
    DEFAULT_FADE_OUT_SAMPLES, DEFAULT_NORMALIZE_PEAK,
};

use crate::chain::Effect;
use crate::convolution::PartitionedConvolver;
use crate::partition::PartitionedIr;

/// IR conditioning applied when a cabinet is built
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CabinetConfig {
    /// Linear fade over the end of the IR (samples)
    pub fade_out_samples: usize,
    /// Peak level the IR is scaled to, or `None` to keep its level
    pub normalize_peak: Option<Sample>,
}

impl Default for CabinetConfig {
    fn default() -> Self {
        Self {
            fade_out_samples: DEFAULT_FADE_OUT_SAMPLES,
            normalize_peak: Some(DEFAULT_NORMALIZE_PEAK),
        }
    }
}

impl CabinetConfig {
    /// Use the IR exactly as given
    pub fn raw() -> Self {
        Self {
            fade_out_samples: 0,
            normalize_peak: None,
        }
    }

    pub fn with_fade_out(mut self, samples: usize) -> Self {
        self.fade_out_samples = samples;
        self
    }

    pub fn with_normalize_peak(mut self, peak: Option<Sample>) -> Self {
        self.normalize_peak = peak;
        self
    }
}

/// Cabinet convolution effect
#[derive(Debug)]
pub struct Cabinet {
    convolvers: Vec<PartitionedConvolver>,
    block_size: usize,
    ir_len: usize,
    /// Deinterleaved input of one channel
    channel_in: Vec<Sample>,
    /// Convolved output of one channel
    channel_out: Vec<Sample>,
}

impl Cabinet {
    pub fn new(
        mut ir: ImpulseResponse,
        channels: usize,
        block_size: usize,
        config: CabinetConfig,
    ) -> AmpResult<Self> {
        ChannelLayout::from_count(channels)?;
        if ir.is_empty() || ir.num_channels() == 0 {
            return Err(AmpError::EmptyImpulseResponse);
        }

        ir.prepare(config.fade_out_samples, config.normalize_peak);

        // Channel c reads IR channel min(c, last); each IR channel is partitioned once
        let used = ir.num_channels().min(channels);
        let partitioned = ir.channels[..used]
            .iter()
            .map(|samples| PartitionedIr::new(samples, block_size).map(Arc::new))
            .collect::<AmpResult<Vec<_>>>()?;

        let convolvers = (0..channels)
            .map(|c| PartitionedConvolver::new(Arc::clone(&partitioned[c.min(used - 1)])))
            .collect::<AmpResult<Vec<_>>>()?;

        log::info!(
            "cabinet: {} ch IR of {} samples @ {} Hz, {} partitions of {} for {} ch",
            ir.num_channels(),
            ir.len(),
            ir.sample_rate,
            partitioned[0].partition_count(),
            block_size,
            channels
        );

        Ok(Self {
            convolvers,
            block_size,
            ir_len: ir.len(),
            channel_in: vec![0.0; block_size],
            channel_out: vec![0.0; block_size],
        })
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn ir_len(&self) -> usize {
        self.ir_len
    }

    pub fn partition_count(&self) -> usize {
        self.convolvers
            .first()
            .map(|c| c.partition_count())
            .unwrap_or(0)
    }

    /// True when channels share one partitioned IR
    pub fn shares_ir(&self) -> bool {
        self.convolvers
            .windows(2)
            .all(|w| Arc::ptr_eq(w[0].impulse_response(), w[1].impulse_response()))
    }
}

impl Effect for Cabinet {
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()> {
        let channels = self.convolvers.len();
        let frames = frame_count(input.len(), channels)?;
        if frames > self.block_size {
            return Err(AmpError::BlockTooLarge {
                max: self.block_size * channels,
                got: input.len(),
            });
        }

        output.clear();
        output.resize(input.len(), 0.0);

        for (c, convolver) in self.convolvers.iter_mut().enumerate() {
            for (dst, frame) in self.channel_in.iter_mut().zip(input.chunks_exact(channels)) {
                *dst = frame[c];
            }
            convolver.process(&self.channel_in[..frames], &mut self.channel_out[..frames])?;
            for (frame, &s) in output
                .chunks_exact_mut(channels)
                .zip(&self.channel_out[..frames])
            {
                frame[c] = s;
            }
        }
        Ok(())
    }

    fn input_channels(&self) -> usize {
        self.convolvers.len()
    }

    fn reset(&mut self) {
        for convolver in &mut self.convolvers {
            convolver.reset();
        }
    }

    fn name(&self) -> &'static str {
        "cabinet"
    }

    fn tail_frames(&self) -> usize {
        self.ir_len.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mono_ir_shared_across_stereo() {
        let ir = ImpulseResponse::from_mono(vec![1.0, 0.5], 48000);
        let mut cab = Cabinet::new(ir, 2, 4, CabinetConfig::raw()).unwrap();
        assert!(cab.shares_ir());

        let mut out = Vec::new();
        cab.apply(&[1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], &mut out)
            .unwrap();
        let expected = [1.0, 2.0, 0.5, 1.0, 0.0, 0.0, 0.0, 0.0];
        for (a, b) in out.iter().zip(&expected) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_stereo_ir_per_channel() {
        let ir = ImpulseResponse::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]], 48000).unwrap();
        let mut cab = Cabinet::new(ir, 2, 4, CabinetConfig::raw()).unwrap();
        assert!(!cab.shares_ir());

        let mut out = Vec::new();
        cab.apply(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], &mut out)
            .unwrap();
        // Left passes straight, right delayed by one frame
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[2], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out[3], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalization_applied() {
        let ir = ImpulseResponse::from_mono(vec![2.0, 0.0, 0.0, 0.0], 48000);
        let config = CabinetConfig::default().with_fade_out(0);
        let mut cab = Cabinet::new(ir, 1, 4, config).unwrap();

        let mut out = Vec::new();
        cab.apply(&[1.0, 0.0, 0.0, 0.0], &mut out).unwrap();
        assert_abs_diff_eq!(out[0], DEFAULT_NORMALIZE_PEAK, epsilon = 1e-9);
    }

    #[test]
    fn test_oversized_block_rejected() {
        let ir = ImpulseResponse::from_mono(vec![1.0], 48000);
        let mut cab = Cabinet::new(ir, 2, 2, CabinetConfig::raw()).unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            cab.apply(&[0.0; 6], &mut out),
            Err(AmpError::BlockTooLarge { max: 4, got: 6 })
        ));
    }

    #[test]
    fn test_empty_ir_rejected() {
        let ir = ImpulseResponse::from_mono(Vec::new(), 48000);
        assert!(matches!(
            Cabinet::new(ir, 1, 64, CabinetConfig::default()),
            Err(AmpError::EmptyImpulseResponse)
        ));
    }

    #[test]
    fn test_tail_frames() {
        let ir = ImpulseResponse::from_mono(vec![0.1; 100], 48000);
        let cab = Cabinet::new(ir, 1, 32, CabinetConfig::raw()).unwrap();
        assert_eq!(cab.tail_frames(), 99);
        assert_eq!(cab.partition_count(), 4);
    }
}
