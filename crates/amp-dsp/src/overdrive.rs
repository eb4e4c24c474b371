//! Wave-digital diode clipper
//!
//! Resistive voltage source and a small capacitor meeting at a parallel
//! adaptor, with an asymmetric diode as the WDF root. The diode equation
//! `v + Rp * i(v) = a` is solved with Newton's method each sample; the
//! capacitor's wave is the only state carried between samples.

use amp_core::{ensure_positive, frame_count, AmpResult, ChannelLayout, Sample};

use crate::chain::Effect;

/// Default series resistance (ohms)
pub const DEFAULT_SERIES_RESISTANCE: Sample = 10_000.0;

/// Default shunt capacitance (farads). With 10 kΩ the corner sits near
/// 16 kHz, so tone is left almost untouched.
pub const DEFAULT_CAPACITANCE: Sample = 1e-9;

/// Saturation current, forward direction (A)
const IS_FORWARD: Sample = 1e-9;

/// Saturation current, reverse direction (A)
const IS_REVERSE: Sample = 5e-8;

/// Thermal voltage at room temperature (V)
const THERMAL_VOLTAGE: Sample = 0.02585;

const MAX_NEWTON_ITERATIONS: usize = 10;
const NEWTON_TOLERANCE: Sample = 1e-6;

#[derive(Debug, Clone)]
pub struct Overdrive {
    resistance: Sample,
    capacitance: Sample,
    sample_rate: Sample,
    /// Share of the source wave at the parallel junction
    source_weight: Sample,
    /// Port resistance seen by the diode
    root_resistance: Sample,
    /// Capacitor wave per channel
    capacitor: Vec<Sample>,
}

impl Overdrive {
    pub fn new(channels: usize, sample_rate: Sample, resistance: Sample) -> AmpResult<Self> {
        let layout = ChannelLayout::from_count(channels)?;
        ensure_positive("sample rate", sample_rate)?;
        ensure_positive("series resistance", resistance)?;
        let mut od = Self {
            resistance,
            capacitance: DEFAULT_CAPACITANCE,
            sample_rate,
            source_weight: 0.0,
            root_resistance: 0.0,
            capacitor: vec![0.0; layout.count()],
        };
        od.update_adaptor();
        Ok(od)
    }

    pub fn with_capacitance(mut self, farads: Sample) -> AmpResult<Self> {
        ensure_positive("capacitance", farads)?;
        self.capacitance = farads;
        self.update_adaptor();
        Ok(self)
    }

    fn update_adaptor(&mut self) {
        let g_source = 1.0 / self.resistance;
        let g_cap = 2.0 * self.capacitance * self.sample_rate;
        self.source_weight = g_source / (g_source + g_cap);
        self.root_resistance = 1.0 / (g_source + g_cap);
    }

    /// Diode voltage for incident wave `a`
    fn solve_diode(&self, a: Sample) -> Sample {
        let r = self.root_resistance;
        // Upper bound for a > 0; converges from the right on the convex branch
        let mut v = if a > 0.0 {
            a.min(THERMAL_VOLTAGE * (1.0 + a / (r * IS_FORWARD)).ln())
        } else {
            a
        };
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let is = if v >= 0.0 { IS_FORWARD } else { IS_REVERSE };
            let e = (v / THERMAL_VOLTAGE).exp();
            let f = v + r * is * (e - 1.0) - a;
            let f_prime = 1.0 + r * is / THERMAL_VOLTAGE * e;
            let delta = f / f_prime;
            v -= delta;
            if delta.abs() < NEWTON_TOLERANCE {
                break;
            }
        }
        v
    }

    #[inline]
    fn process_sample(&mut self, channel: usize, input: Sample) -> Sample {
        let z = self.capacitor[channel];
        let a = self.source_weight * input + (1.0 - self.source_weight) * z;
        let v = self.solve_diode(a);
        self.capacitor[channel] = 2.0 * v - z;
        v
    }
}

impl Effect for Overdrive {
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()> {
        let channels = self.capacitor.len();
        frame_count(input.len(), channels)?;

        output.clear();
        output.extend(
            input
                .iter()
                .enumerate()
                .map(|(i, &x)| self.process_sample(i % channels, x)),
        );
        Ok(())
    }

    fn input_channels(&self) -> usize {
        self.capacitor.len()
    }

    fn reset(&mut self) {
        self.capacitor.fill(0.0);
    }

    fn name(&self) -> &'static str {
        "overdrive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn drive(input: &[Sample]) -> Vec<Sample> {
        let mut od = Overdrive::new(1, 48000.0, DEFAULT_SERIES_RESISTANCE).unwrap();
        let mut out = Vec::new();
        od.apply(input, &mut out).unwrap();
        out
    }

    #[test]
    fn test_silence_stays_silent() {
        assert!(drive(&[0.0; 64]).iter().all(|s| s.abs() < 1e-9));
    }

    #[test]
    fn test_small_signal_passes() {
        let out = drive(&[0.01; 512]);
        assert_abs_diff_eq!(out[511], 0.01, epsilon = 1e-4);
    }

    #[test]
    fn test_positive_half_clipped() {
        let input: Vec<Sample> = (0..4800).map(|i| (i as Sample * 0.01).sin()).collect();
        let out = drive(&input);
        let pos = out.iter().fold(0.0, |m: Sample, &s| m.max(s));
        let neg = out.iter().fold(0.0, |m: Sample, &s| m.min(s));

        assert!(out.iter().all(|s| s.is_finite()));
        assert!(pos < 0.5, "positive peak {pos}");
        // Reverse-biased half passes almost linearly
        assert!(neg < -0.9, "negative peak {neg}");
    }

    #[test]
    fn test_hot_input_stays_finite() {
        let input: Vec<Sample> = (0..2000).map(|i| 50.0 * (i as Sample * 0.003).sin()).collect();
        assert!(drive(&input).iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_stereo_channels_independent() {
        let mut od = Overdrive::new(2, 48000.0, DEFAULT_SERIES_RESISTANCE).unwrap();
        let mut out = Vec::new();
        od.apply(&[0.5, 0.0, 0.5, 0.0], &mut out).unwrap();
        assert!(out[0].abs() > 0.0);
        assert!(out[1].abs() < 1e-9);
        assert!(out[3].abs() < 1e-9);
    }

    #[test]
    fn test_misaligned_block_rejected() {
        let mut od = Overdrive::new(2, 48000.0, DEFAULT_SERIES_RESISTANCE).unwrap();
        let mut out = Vec::new();
        assert!(od.apply(&[0.0; 3], &mut out).is_err());
    }

    #[test]
    fn test_invalid_components_rejected() {
        assert!(Overdrive::new(1, 48000.0, 0.0).is_err());
        assert!(Overdrive::new(1, 48000.0, -10.0).is_err());
        assert!(Overdrive::new(1, 48000.0, Sample::NAN).is_err());
        assert!(Overdrive::new(1, 0.0, DEFAULT_SERIES_RESISTANCE).is_err());

        let od = Overdrive::new(1, 48000.0, DEFAULT_SERIES_RESISTANCE).unwrap();
        assert!(od.clone().with_capacitance(0.0).is_err());
        assert!(od.clone().with_capacitance(Sample::INFINITY).is_err());
        assert!(od.with_capacitance(4.7e-9).is_ok());
    }
}
