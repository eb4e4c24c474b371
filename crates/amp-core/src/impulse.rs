//! Impulse response data model
//!
//! An [`ImpulseResponse`] is read once (usually from a cabinet recording),
//! conditioned with [`ImpulseResponse::prepare`] and then handed to the
//! convolution engine, which never mutates it again.

use crate::{deinterleave, AmpError, AmpResult, Sample};

/// Peak level below which an IR is treated as silent and not normalized
pub const SILENCE_EPSILON: Sample = 1e-5;

/// Default linear fade applied to the end of an IR (samples)
pub const DEFAULT_FADE_OUT_SAMPLES: usize = 256;

/// Default peak level an IR is normalized to
pub const DEFAULT_NORMALIZE_PEAK: Sample = 0.5;

/// Deinterleaved impulse response
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    /// One Vec per channel, all of equal length
    pub channels: Vec<Vec<Sample>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl ImpulseResponse {
    /// Create from per-channel data. All channels must have the same length.
    pub fn new(channels: Vec<Vec<Sample>>, sample_rate: u32) -> AmpResult<Self> {
        let len = channels.first().map(Vec::len).unwrap_or(0);
        if channels.iter().any(|c| c.len() != len) {
            return Err(AmpError::InvalidParam(
                "impulse response channels differ in length".to_string(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a single-channel IR
    pub fn from_mono(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self {
            channels: vec![samples],
            sample_rate,
        }
    }

    /// Create from interleaved samples
    pub fn from_interleaved(samples: &[Sample], num_channels: usize, sample_rate: u32) -> Self {
        Self {
            channels: deinterleave(samples, num_channels),
            sample_rate,
        }
    }

    /// Length in samples (per channel)
    pub fn len(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Channel data, or `None` if out of range
    pub fn channel(&self, ch: usize) -> Option<&[Sample]> {
        self.channels.get(ch).map(Vec::as_slice)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.len() as f64 / self.sample_rate as f64
        }
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Vec<Sample> {
        let n = self.num_channels();
        if n == 0 {
            return Vec::new();
        }
        (0..self.len())
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<Sample>() / n as Sample)
            .collect()
    }

    /// Absolute peak across all channels
    pub fn peak(&self) -> Sample {
        self.channels
            .iter()
            .map(|c| crate::peak(c))
            .fold(0.0, Sample::max)
    }

    /// Condition the IR for cabinet use: fade out the last `fade_out_samples`
    /// linearly (the final sample reaches silence), then scale all channels
    /// jointly so the peak equals `normalize_peak`. Normalization is skipped
    /// for a near-silent IR.
    pub fn prepare(&mut self, fade_out_samples: usize, normalize_peak: Option<Sample>) {
        let len = self.len();
        let fade_len = len.min(fade_out_samples);
        for channel in &mut self.channels {
            for k in 0..fade_len {
                let gain = k as Sample / fade_len as Sample;
                channel[len - 1 - k] *= gain;
            }
        }

        let Some(target) = normalize_peak else {
            return;
        };
        let peak = self.peak();
        if peak <= SILENCE_EPSILON {
            log::debug!("IR peak {peak:e} below silence threshold, skipping normalization");
            return;
        }
        let scale = target / peak;
        for channel in &mut self.channels {
            for s in channel.iter_mut() {
                *s *= scale;
            }
        }
    }
}
