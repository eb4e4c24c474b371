//! Granular pitch shifter
//!
//! Two read heads sweep a circular delay buffer half a grain apart. The
//! delay of each head changes at a rate set by the pitch factor, and
//! triangular windows crossfade the heads so each resets while silent.

use amp_core::{frame_count, AmpError, AmpResult, ChannelLayout, Sample};

use crate::chain::Effect;

/// Grain length (seconds)
pub const GRAIN_SECONDS: Sample = 0.050;

/// Delay buffer length in grains
const BUFFER_GRAINS: usize = 4;

#[derive(Debug, Clone)]
pub struct PitchShifter {
    factor: Sample,
    channels: usize,
    grain_frames: usize,
    /// Frames in the circular buffer
    buffer_frames: usize,
    /// Interleaved circular buffer
    buffer: Vec<Sample>,
    cursor: usize,
    /// Delay phase of the first head, 0..1
    phasor: Sample,
}

impl PitchShifter {
    /// `factor` is the frequency ratio: 2.0 is an octave up, 0.5 an octave down
    pub fn new(channels: usize, sample_rate: Sample, factor: Sample) -> AmpResult<Self> {
        let layout = ChannelLayout::from_count(channels)?;
        let grain_frames = (GRAIN_SECONDS * sample_rate) as usize;
        if grain_frames == 0 {
            return Err(AmpError::InvalidParam(format!(
                "sample rate {sample_rate} too low for pitch shifting"
            )));
        }
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(AmpError::InvalidParam(format!(
                "pitch factor must be positive, got {factor}"
            )));
        }

        let buffer_frames = grain_frames * BUFFER_GRAINS;
        Ok(Self {
            factor,
            channels: layout.count(),
            grain_frames,
            buffer_frames,
            buffer: vec![0.0; buffer_frames * layout.count()],
            cursor: 0,
            phasor: 0.0,
        })
    }

    pub fn factor(&self) -> Sample {
        self.factor
    }

    pub fn grain_frames(&self) -> usize {
        self.grain_frames
    }

    /// Linearly interpolated read `delay` frames behind `cursor`
    fn read(&self, delay: Sample, channel: usize) -> Sample {
        let len = self.buffer_frames as Sample;
        let pos = (self.cursor as Sample - delay).rem_euclid(len);

        let i1 = (pos as usize).min(self.buffer_frames - 1);
        let i2 = (i1 + 1) % self.buffer_frames;
        let frac = pos - i1 as Sample;

        let s1 = self.buffer[i1 * self.channels + channel];
        let s2 = self.buffer[i2 * self.channels + channel];
        s1 + frac * (s2 - s1)
    }
}

/// Triangle window over one phase cycle, peaking at 0.5
#[inline]
fn triangle(phase: Sample) -> Sample {
    1.0 - 2.0 * (phase - 0.5).abs()
}

impl Effect for PitchShifter {
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()> {
        let channels = self.channels;
        frame_count(input.len(), channels)?;
        let grain = self.grain_frames as Sample;
        let increment = (1.0 - self.factor) / grain;

        output.clear();
        for frame in input.chunks_exact(channels) {
            let base = self.cursor * channels;
            self.buffer[base..base + channels].copy_from_slice(frame);

            let phase_a = self.phasor;
            let mut phase_b = self.phasor + 0.5;
            if phase_b >= 1.0 {
                phase_b -= 1.0;
            }
            let (weight_a, weight_b) = (triangle(phase_a), triangle(phase_b));

            for c in 0..channels {
                let a = self.read(phase_a * grain, c);
                let b = self.read(phase_b * grain, c);
                output.push(a * weight_a + b * weight_b);
            }

            self.cursor = (self.cursor + 1) % self.buffer_frames;
            self.phasor = (self.phasor + increment).rem_euclid(1.0);
        }
        Ok(())
    }

    fn input_channels(&self) -> usize {
        self.channels
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.cursor = 0;
        self.phasor = 0.0;
    }

    fn name(&self) -> &'static str {
        "pitchshifter"
    }

    fn params_tag(&self) -> String {
        format!("{:.2}", self.factor)
    }

    /// Heads read at most one grain behind the write cursor
    fn tail_frames(&self) -> usize {
        self.grain_frames
    }
}
