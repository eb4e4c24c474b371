//! Stereo to mono downmix

use std::f64::consts::FRAC_1_SQRT_2;

use amp_core::{frame_count, AmpResult, Sample};

use crate::chain::Effect;

/// Equal-power sum of a stereo pair
#[inline]
pub fn downmix(left: Sample, right: Sample) -> Sample {
    (left + right) * FRAC_1_SQRT_2
}

/// Two channels in, one out
#[derive(Debug, Clone, Copy, Default)]
pub struct StereoToMono;

impl StereoToMono {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for StereoToMono {
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()> {
        frame_count(input.len(), 2)?;
        output.clear();
        output.extend(input.chunks_exact(2).map(|f| downmix(f[0], f[1])));
        Ok(())
    }

    fn input_channels(&self) -> usize {
        2
    }

    fn output_channels(&self) -> usize {
        1
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "stereo_to_mono"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_equal_power_sum() {
        let mut fx = StereoToMono::new();
        let mut out = Vec::new();
        fx.apply(&[1.0, 1.0, 1.0, -1.0, 0.5, 0.0], &mut out).unwrap();
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0], 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2], 0.5 * FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_odd_length_rejected() {
        let mut out = Vec::new();
        assert!(StereoToMono.apply(&[1.0], &mut out).is_err());
    }
}
