//! Auto-wah ("crybaby")
//!
//! A band-pass state-variable filter swept by a raised-cosine LFO, or by
//! the input envelope, mixed 80 % wet with the dry signal.

use serde::{Deserialize, Serialize};

use amp_core::{frame_count, lerp, AmpResult, ChannelLayout, Sample};

use crate::chain::Effect;
use crate::envelope::EnvelopeFollower;
use crate::svf::{
    exponential_cutoff, swept_resonance, validate_sweep, FilterMode, StateVariableFilter, SweepLfo,
    DEFAULT_RESONANCE_FACTOR, DEFAULT_RESONANCE_START, DEFAULT_START_CUTOFF_HZ,
    DEFAULT_SWEEP_SPEED_HZ,
};

/// Default upper cutoff of the wah sweep (Hz)
pub const DEFAULT_WAH_END_CUTOFF_HZ: Sample = 2500.0;

const WET_MIX: Sample = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WahParams {
    pub resonance_start: Sample,
    pub resonance_factor: Sample,
    pub sweep_speed_hz: Sample,
    pub start_cutoff_hz: Sample,
    pub end_cutoff_hz: Sample,
    /// Drive the cutoff from the input envelope instead of the LFO
    pub use_envelope: bool,
}

impl Default for WahParams {
    fn default() -> Self {
        Self {
            resonance_start: DEFAULT_RESONANCE_START,
            resonance_factor: DEFAULT_RESONANCE_FACTOR,
            sweep_speed_hz: DEFAULT_SWEEP_SPEED_HZ,
            start_cutoff_hz: DEFAULT_START_CUTOFF_HZ,
            end_cutoff_hz: DEFAULT_WAH_END_CUTOFF_HZ,
            use_envelope: true,
        }
    }
}

#[derive(Debug, Clone)]
struct WahChannel {
    filter: StateVariableFilter,
    envelope: EnvelopeFollower,
}

#[derive(Debug, Clone)]
pub struct Wah {
    params: WahParams,
    sample_rate: Sample,
    channels: Vec<WahChannel>,
    lfo: SweepLfo,
}

impl Wah {
    pub fn new(channels: usize, sample_rate: Sample, params: WahParams) -> AmpResult<Self> {
        let layout = ChannelLayout::from_count(channels)?;
        validate_sweep(
            sample_rate,
            params.start_cutoff_hz,
            params.end_cutoff_hz,
            params.sweep_speed_hz,
            params.resonance_start,
            params.resonance_factor,
        )?;
        let channel = WahChannel {
            filter: StateVariableFilter::new(),
            envelope: EnvelopeFollower::new(sample_rate),
        };
        Ok(Self {
            params,
            sample_rate,
            channels: vec![channel; layout.count()],
            lfo: SweepLfo::new(params.sweep_speed_hz, sample_rate),
        })
    }

    pub fn params(&self) -> &WahParams {
        &self.params
    }
}

impl Effect for Wah {
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()> {
        let channels = self.channels.len();
        frame_count(input.len(), channels)?;
        let p = self.params;

        output.clear();
        for frame in input.chunks_exact(channels) {
            let sweep = self.lfo.next_value();
            let resonance = swept_resonance(p.resonance_start, p.resonance_factor, sweep);

            for (ch, &x) in self.channels.iter_mut().zip(frame) {
                let cutoff = if p.use_envelope {
                    ch.envelope.process(x)
                } else {
                    exponential_cutoff(p.start_cutoff_hz, p.end_cutoff_hz, self.sample_rate, sweep)
                };
                let band = ch.filter.process(x, cutoff, resonance, FilterMode::BandPass);
                output.push(lerp(x, band, WET_MIX));
            }
        }
        Ok(())
    }

    fn input_channels(&self) -> usize {
        self.channels.len()
    }

    fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.filter.reset();
            ch.envelope.reset();
        }
        self.lfo.reset();
    }

    fn name(&self) -> &'static str {
        "crybaby"
    }

    fn params_tag(&self) -> String {
        let p = &self.params;
        format!(
            "{:.2}_{:.2}_{:.2}_{:.2}_{:.2}_{:.2}",
            p.resonance_start,
            p.resonance_factor,
            p.sweep_speed_hz,
            if p.use_envelope { 1.0 } else { 0.0 },
            p.start_cutoff_hz,
            p.end_cutoff_hz
        )
    }
}
