//! Sample types and interleaved buffer helpers

use crate::{AmpError, AmpResult};

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Number of whole frames in an interleaved buffer.
///
/// Fails if `len` is not a multiple of `channels`.
#[inline]
pub fn frame_count(len: usize, channels: usize) -> AmpResult<usize> {
    if channels == 0 || len % channels != 0 {
        return Err(AmpError::MisalignedBlock { len, channels });
    }
    Ok(len / channels)
}

/// Split interleaved samples into one Vec per channel
pub fn deinterleave(samples: &[Sample], channels: usize) -> Vec<Vec<Sample>> {
    if channels == 0 {
        return Vec::new();
    }
    let frames = samples.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (ch, &sample) in frame.iter().enumerate() {
            out[ch].push(sample);
        }
    }
    out
}

/// Interleave per-channel data. Shorter channels are padded with silence.
pub fn interleave(channels: &[Vec<Sample>]) -> Vec<Sample> {
    let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * channels.len());
    for i in 0..frames {
        for ch in channels {
            out.push(ch.get(i).copied().unwrap_or(0.0));
        }
    }
    out
}

/// Absolute peak of a buffer
#[inline]
pub fn peak(samples: &[Sample]) -> Sample {
    samples.iter().map(|s| s.abs()).fold(0.0, Sample::max)
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: Sample, b: Sample, t: Sample) -> Sample {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(8, 2).unwrap(), 4);
        assert!(frame_count(7, 2).is_err());
        assert!(frame_count(4, 0).is_err());
    }

    #[test]
    fn test_interleave_roundtrip_with_padding() {
        let channels = vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0]];
        let interleaved = interleave(&channels);
        assert_eq!(interleaved, vec![1.0, -1.0, 2.0, -2.0, 3.0, 0.0]);

        let split = deinterleave(&interleaved, 2);
        assert_eq!(split[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(split[1], vec![-1.0, -2.0, 0.0]);
    }

    #[test]
    fn test_peak() {
        assert_eq!(peak(&[0.25, -0.75, 0.5]), 0.75);
        assert_eq!(peak(&[]), 0.0);
    }
}
