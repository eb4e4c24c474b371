//! Bit-depth and sample-rate reduction

use amp_core::{
    ensure_finite, ensure_in_range, ensure_positive, frame_count, lerp, AmpError, AmpResult,
    ChannelLayout, Sample,
};

use crate::chain::Effect;

pub const DEFAULT_BIT_DEPTH: Sample = 12.0;
pub const DEFAULT_DOWNSAMPLE: Sample = 8.0;

/// Deepest quantisation accepted; finer steps are below f32 output resolution
pub const MAX_BIT_DEPTH: Sample = 32.0;

/// Share of the crushed signal in the output
const WET_MIX: Sample = 0.5;

#[derive(Debug, Clone, Copy)]
struct HoldState {
    counter: Sample,
    last: Sample,
}

#[derive(Debug, Clone)]
pub struct Bitcrusher {
    bit_depth: Sample,
    downsample: Sample,
    /// 2^bit_depth
    levels: Sample,
    states: Vec<HoldState>,
}

impl Bitcrusher {
    /// `downsample` is the hold length in samples and may be fractional
    pub fn new(channels: usize, bit_depth: Sample, downsample: Sample) -> AmpResult<Self> {
        let layout = ChannelLayout::from_count(channels)?;
        ensure_positive("bit depth", bit_depth)?;
        ensure_in_range("bit depth", bit_depth, 0.0..=MAX_BIT_DEPTH)?;
        ensure_finite("downsample factor", downsample)?;
        if !(downsample >= 1.0) {
            return Err(AmpError::InvalidParam(format!(
                "downsample factor must be at least 1, got {downsample}"
            )));
        }
        Ok(Self {
            bit_depth,
            downsample,
            levels: bit_depth.exp2(),
            states: vec![HoldState { counter: 0.0, last: 0.0 }; layout.count()],
        })
    }

    pub fn bit_depth(&self) -> Sample {
        self.bit_depth
    }

    pub fn downsample(&self) -> Sample {
        self.downsample
    }
}

impl Effect for Bitcrusher {
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()> {
        let channels = self.states.len();
        frame_count(input.len(), channels)?;

        output.clear();
        for (i, &x) in input.iter().enumerate() {
            let state = &mut self.states[i % channels];
            state.counter += 1.0;
            if state.counter >= self.downsample {
                state.last = (x * self.levels).round() / self.levels;
                state.counter -= self.downsample;
            }
            output.push(lerp(x, state.last, WET_MIX));
        }
        Ok(())
    }

    fn input_channels(&self) -> usize {
        self.states.len()
    }

    fn reset(&mut self) {
        for state in &mut self.states {
            *state = HoldState { counter: 0.0, last: 0.0 };
        }
    }

    fn name(&self) -> &'static str {
        "bitcrusher"
    }

    fn params_tag(&self) -> String {
        format!("{:.2}_{:.2}", self.bit_depth, self.downsample)
    }
}
