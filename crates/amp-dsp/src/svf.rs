//! State-variable filter
//!
//! Trapezoidal-integration (TPT) SVF after Zavalishin, "The Art of VA
//! Filter Design", with cutoff and resonance normalized to 0..1 so they can
//! be swept per sample. [`SweptFilter`] runs one per channel under an LFO.

use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use amp_core::{
    ensure_finite, ensure_in_range, ensure_positive, frame_count, AmpError, AmpResult,
    ChannelLayout, Sample,
};

use crate::chain::Effect;

// ============ Filter Mode ============

/// SVF output tap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    HighPass,
    LowPass,
    BandPass,
    /// Band boost/cut by the given factor
    BandShelving(Sample),
    Notch,
    AllPass,
    /// Low-pass minus high-pass, clipped at unity
    Peaking,
}

impl Default for FilterMode {
    fn default() -> Self {
        Self::BandPass
    }
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighPass => "high_pass",
            Self::LowPass => "low_pass",
            Self::BandPass => "band_pass",
            Self::BandShelving(_) => "band_shelving",
            Self::Notch => "notch_filter",
            Self::AllPass => "all_pass_filter",
            Self::Peaking => "peaking_filter",
        }
    }
}

impl FromStr for FilterMode {
    type Err = AmpError;

    /// Parses the mode names of [`FilterMode::as_str`], plus the short
    /// forms `notch`, `all_pass` and `peaking`. `band_shelving` takes an
    /// optional factor as `band_shelving:<f>`.
    fn from_str(s: &str) -> AmpResult<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        let mode = match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "high_pass" | "highpass" => Self::HighPass,
            "low_pass" | "lowpass" => Self::LowPass,
            "band_pass" | "bandpass" => Self::BandPass,
            "band_shelving" => {
                let factor = match arg {
                    Some(a) => a.parse::<Sample>().map_err(|_| {
                        AmpError::InvalidParam(format!("invalid shelving factor '{a}'"))
                    })?,
                    None => DEFAULT_SHELVING_FACTOR,
                };
                Self::BandShelving(factor)
            }
            "notch" | "notch_filter" => Self::Notch,
            "all_pass" | "all_pass_filter" | "allpass" => Self::AllPass,
            "peaking" | "peaking_filter" => Self::Peaking,
            other => {
                return Err(AmpError::InvalidParam(format!(
                    "unknown filter mode '{other}'"
                )))
            }
        };
        Ok(mode)
    }
}

// ============ State Variable Filter ============

/// Single-channel TPT state-variable filter
#[derive(Debug, Clone, Default)]
pub struct StateVariableFilter {
    /// Integrator states
    ic1eq: Sample,
    ic2eq: Sample,
}

impl StateVariableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one sample.
    ///
    /// `cutoff` is normalized to Nyquist (0..1), `resonance` runs from 0
    /// (fully damped) towards 1 (self-oscillation).
    #[inline]
    pub fn process(
        &mut self,
        input: Sample,
        cutoff: Sample,
        resonance: Sample,
        mode: FilterMode,
    ) -> Sample {
        let g = (PI * cutoff * 0.5).tan();
        let k = 2.0 - 2.0 * resonance;

        let v0 = input;
        let v3 = v0 - self.ic2eq;
        let v1 = (g * v3 + self.ic1eq) / (1.0 + g * (g + k));
        let v2 = g * v1 + self.ic2eq;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match mode {
            FilterMode::HighPass => v0 - k * v1 - v2,
            FilterMode::LowPass => v2,
            FilterMode::BandPass => v1,
            FilterMode::BandShelving(factor) => v0 + 2.0 * k * factor * v1,
            FilterMode::Notch => v0 - 2.0 * k * v1,
            FilterMode::AllPass => v0 - 4.0 * k * v1,
            FilterMode::Peaking => {
                let hp = v0 - k * v1 - v2;
                (v2 - hp).min(1.0)
            }
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

// ============ Sweep LFO ============

/// Raised-cosine LFO shared by the swept filter and the wah
#[derive(Debug, Clone)]
pub struct SweepLfo {
    phase: Sample,
    increment: Sample,
}

impl SweepLfo {
    pub fn new(speed_hz: Sample, sample_rate: Sample) -> Self {
        Self {
            phase: 0.0,
            increment: speed_hz / sample_rate,
        }
    }

    /// Advance one sample and return the sweep position in 0..1
    #[inline]
    pub fn next_value(&mut self) -> Sample {
        self.phase += self.increment;
        if self.phase > 1.0 {
            self.phase -= 1.0;
        }
        0.5 * (1.0 - (2.0 * PI * self.phase).cos())
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Exponential map of `sweep` (0..1) onto `start_hz..end_hz`, normalized by
/// the sample rate
#[inline]
pub fn exponential_cutoff(
    start_hz: Sample,
    end_hz: Sample,
    sample_rate: Sample,
    sweep: Sample,
) -> Sample {
    start_hz * (end_hz / start_hz).powf(sweep) / sample_rate
}

/// Check a sweep's cutoffs and speed against the sample rate.
///
/// Cutoffs must sit in `(0, fs/2]` and the LFO may not run faster than
/// Nyquist; resonance terms only need to be finite.
pub fn validate_sweep(
    sample_rate: Sample,
    start_cutoff_hz: Sample,
    end_cutoff_hz: Sample,
    sweep_speed_hz: Sample,
    resonance_start: Sample,
    resonance_factor: Sample,
) -> AmpResult<()> {
    ensure_positive("sample rate", sample_rate)?;
    let nyquist = sample_rate / 2.0;
    for (name, hz) in [("start cutoff", start_cutoff_hz), ("end cutoff", end_cutoff_hz)] {
        ensure_positive(name, hz)?;
        ensure_in_range(name, hz, 0.0..=nyquist)?;
    }
    ensure_in_range("sweep speed", sweep_speed_hz, 0.0..=nyquist)?;
    ensure_finite("resonance start", resonance_start)?;
    ensure_finite("resonance factor", resonance_factor)
}

/// Resonance rising with the sweep, capped below self-oscillation
#[inline]
pub fn swept_resonance(start: Sample, factor: Sample, sweep: Sample) -> Sample {
    (start + factor * sweep).min(0.99)
}

// ============ Swept Filter ============

pub const DEFAULT_RESONANCE_START: Sample = 0.85;
pub const DEFAULT_RESONANCE_FACTOR: Sample = 0.12;
pub const DEFAULT_SWEEP_SPEED_HZ: Sample = 1.5;
pub const DEFAULT_START_CUTOFF_HZ: Sample = 450.0;
pub const DEFAULT_SHELVING_FACTOR: Sample = 0.5;

/// Default upper cutoff of the swept filter (Hz)
pub const DEFAULT_FILTER_END_CUTOFF_HZ: Sample = 2200.0;

/// Swept filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweptFilterParams {
    pub mode: FilterMode,
    pub resonance_start: Sample,
    pub resonance_factor: Sample,
    pub sweep_speed_hz: Sample,
    pub start_cutoff_hz: Sample,
    pub end_cutoff_hz: Sample,
}

impl Default for SweptFilterParams {
    fn default() -> Self {
        Self {
            mode: FilterMode::default(),
            resonance_start: DEFAULT_RESONANCE_START,
            resonance_factor: DEFAULT_RESONANCE_FACTOR,
            sweep_speed_hz: DEFAULT_SWEEP_SPEED_HZ,
            start_cutoff_hz: DEFAULT_START_CUTOFF_HZ,
            end_cutoff_hz: DEFAULT_FILTER_END_CUTOFF_HZ,
        }
    }
}

/// LFO-swept state-variable filter, one SVF per channel
#[derive(Debug, Clone)]
pub struct SweptFilter {
    params: SweptFilterParams,
    sample_rate: Sample,
    filters: Vec<StateVariableFilter>,
    lfo: SweepLfo,
}

impl SweptFilter {
    pub fn new(
        channels: usize,
        sample_rate: Sample,
        params: SweptFilterParams,
    ) -> AmpResult<Self> {
        let layout = ChannelLayout::from_count(channels)?;
        validate_sweep(
            sample_rate,
            params.start_cutoff_hz,
            params.end_cutoff_hz,
            params.sweep_speed_hz,
            params.resonance_start,
            params.resonance_factor,
        )?;
        if let FilterMode::BandShelving(factor) = params.mode {
            ensure_finite("shelving factor", factor)?;
        }
        Ok(Self {
            params,
            sample_rate,
            filters: vec![StateVariableFilter::new(); layout.count()],
            lfo: SweepLfo::new(params.sweep_speed_hz, sample_rate),
        })
    }

    pub fn params(&self) -> &SweptFilterParams {
        &self.params
    }
}

impl Effect for SweptFilter {
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()> {
        let channels = self.filters.len();
        frame_count(input.len(), channels)?;
        let p = self.params;

        output.clear();
        for frame in input.chunks_exact(channels) {
            let sweep = self.lfo.next_value();
            let cutoff =
                exponential_cutoff(p.start_cutoff_hz, p.end_cutoff_hz, self.sample_rate, sweep);
            let resonance = swept_resonance(p.resonance_start, p.resonance_factor, sweep);
            for (filter, &x) in self.filters.iter_mut().zip(frame) {
                output.push(filter.process(x, cutoff, resonance, p.mode));
            }
        }
        Ok(())
    }

    fn input_channels(&self) -> usize {
        self.filters.len()
    }

    fn reset(&mut self) {
        self.filters.iter_mut().for_each(StateVariableFilter::reset);
        self.lfo.reset();
    }

    fn name(&self) -> &'static str {
        "svf"
    }

    fn params_tag(&self) -> String {
        let p = &self.params;
        let shelving = match p.mode {
            FilterMode::BandShelving(f) => f,
            _ => DEFAULT_SHELVING_FACTOR,
        };
        format!(
            "{:.2}_{:.2}_{:.2}_{:.2}_{}",
            p.resonance_start,
            shelving,
            p.start_cutoff_hz,
            p.end_cutoff_hz,
            p.mode.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn settle(mode: FilterMode, input: Sample) -> Sample {
        let mut svf = StateVariableFilter::new();
        let mut out = 0.0;
        for _ in 0..10_000 {
            out = svf.process(input, 0.1, 0.0, mode);
        }
        out
    }

    #[test]
    fn test_dc_response() {
        // A constant input settles into the low-pass tap
        assert_abs_diff_eq!(settle(FilterMode::LowPass, 1.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(settle(FilterMode::HighPass, 1.0), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(settle(FilterMode::BandPass, 1.0), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(settle(FilterMode::Notch, 1.0), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_peaking_clipped_at_unity() {
        assert!(settle(FilterMode::Peaking, 5.0) <= 1.0);
    }

    #[test]
    fn test_lowpass_attenuates_nyquist() {
        let mut svf = StateVariableFilter::new();
        let mut peak: Sample = 0.0;
        for i in 0..4096 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let y = svf.process(x, 0.05, 0.0, FilterMode::LowPass);
            if i > 2048 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.01);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("low_pass".parse::<FilterMode>().unwrap(), FilterMode::LowPass);
        assert_eq!("notch".parse::<FilterMode>().unwrap(), FilterMode::Notch);
        assert_eq!(
            "band_shelving:0.25".parse::<FilterMode>().unwrap(),
            FilterMode::BandShelving(0.25)
        );
        assert!("comb".parse::<FilterMode>().is_err());
    }

    #[test]
    fn test_lfo_range() {
        let mut lfo = SweepLfo::new(1.5, 48000.0);
        for _ in 0..100_000 {
            let v = lfo.next_value();
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_sweep_maps() {
        assert_abs_diff_eq!(exponential_cutoff(450.0, 2200.0, 48000.0, 0.0), 450.0 / 48000.0);
        assert_abs_diff_eq!(
            exponential_cutoff(450.0, 2200.0, 48000.0, 1.0),
            2200.0 / 48000.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(swept_resonance(0.85, 0.12, 1.0), 0.97, epsilon = 1e-12);
        assert_eq!(swept_resonance(0.95, 0.12, 1.0), 0.99);
    }

    #[test]
    fn test_swept_filter_stereo() {
        let mut filter = SweptFilter::new(2, 48000.0, SweptFilterParams::default()).unwrap();
        let input: Vec<Sample> = (0..256)
            .flat_map(|i| {
                let s = (i as Sample * 0.2).sin();
                [s, s]
            })
            .collect();
        let mut out = Vec::new();
        filter.apply(&input, &mut out).unwrap();
        assert_eq!(out.len(), input.len());
        assert!(out.iter().all(|s| s.is_finite()));
        // Identical channels stay identical
        for frame in out.chunks_exact(2) {
            assert_abs_diff_eq!(frame[0], frame[1], epsilon = 1e-12);
        }
        assert_eq!(filter.params_tag(), "0.85_0.50_450.00_2200.00_band_pass");
    }

    #[test]
    fn test_rejects_surround() {
        assert!(SweptFilter::new(6, 48000.0, SweptFilterParams::default()).is_err());
    }

    #[test]
    fn test_rejects_bad_sweep() {
        let bad = [
            SweptFilterParams { start_cutoff_hz: 0.0, ..Default::default() },
            SweptFilterParams { end_cutoff_hz: -200.0, ..Default::default() },
            SweptFilterParams { end_cutoff_hz: 30_000.0, ..Default::default() },
            SweptFilterParams { sweep_speed_hz: Sample::NAN, ..Default::default() },
            SweptFilterParams { resonance_start: Sample::INFINITY, ..Default::default() },
            SweptFilterParams {
                mode: FilterMode::BandShelving(Sample::NAN),
                ..Default::default()
            },
        ];
        for params in bad {
            assert!(
                matches!(SweptFilter::new(1, 48000.0, params), Err(AmpError::InvalidParam(_))),
                "{params:?}"
            );
        }
        assert!(SweptFilter::new(1, 0.0, SweptFilterParams::default()).is_err());
    }
}
