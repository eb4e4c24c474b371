//! Rotating binaural panner
//!
//! Moves a mono source in a circle around the listener's head. Each frame
//! derives from the current azimuth:
//! - an interaural time difference applied as a fractional delay on the
//!   far ear (Woodworth's spherical-head formula, or a plain sine model)
//! - equal-power interaural level gains
//! - optional head-shadow and rear low-pass filtering per ear
//!
//! Reference: F. Rumsey, "Spatial Audio".

use std::f64::consts::{FRAC_PI_4, TAU};

use serde::{Deserialize, Serialize};

use amp_core::{ensure_finite, ensure_positive, frame_count, lerp, AmpResult, ChannelLayout, Sample};

use crate::chain::Effect;
use crate::downmix::downmix;
use crate::svf::{FilterMode, StateVariableFilter};

/// Average head radius (m)
const HEAD_RADIUS: Sample = 0.0875;

/// Speed of sound (m/s)
const SPEED_OF_SOUND: Sample = 340.0;

/// Maximum ITD of the sine model (s)
const SIMPLE_MAX_ITD: Sample = 0.00065;

/// Delay line length (frames)
const DELAY_FRAMES: usize = 4410;

const NORMAL_CUTOFF: Sample = 0.99;
const SHADOW_CUTOFF: Sample = 0.35;
const REAR_CUTOFF: Sample = 0.20;
const SHADOW_RESONANCE: Sample = 0.5;

/// Default rotation speed (rad/s)
pub const DEFAULT_ROTATION_SPEED: Sample = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinauralParams {
    /// Angular speed of the source (rad/s)
    pub rotation_speed: Sample,
    /// Woodworth ITD instead of the sine model
    pub woodworth_delay: bool,
    /// Head-shadow and rear filtering
    pub head_shadow: bool,
}

impl Default for BinauralParams {
    fn default() -> Self {
        Self {
            rotation_speed: DEFAULT_ROTATION_SPEED,
            woodworth_delay: true,
            head_shadow: true,
        }
    }
}

/// ITD in frames from Woodworth's formula; `azimuth` measured from the
/// median plane
#[inline]
pub fn woodworth_itd(azimuth: Sample, sample_rate: Sample) -> Sample {
    let theta = azimuth.abs();
    HEAD_RADIUS * (theta + theta.sin()) / SPEED_OF_SOUND * sample_rate
}

/// ITD in frames from the sine model
#[inline]
pub fn simple_itd(angle: Sample, sample_rate: Sample) -> Sample {
    (angle.sin() * SIMPLE_MAX_ITD * sample_rate).abs()
}

#[derive(Debug, Clone)]
pub struct BinauralPanner {
    params: BinauralParams,
    sample_rate: Sample,
    input_channels: usize,
    /// Source azimuth (rad), 0 = front, pi/2 = right
    angle: Sample,
    delay_line: Vec<Sample>,
    write_index: usize,
    shadow_left: StateVariableFilter,
    shadow_right: StateVariableFilter,
}

impl BinauralPanner {
    pub fn new(input_channels: usize, sample_rate: Sample, params: BinauralParams) -> AmpResult<Self> {
        let layout = ChannelLayout::from_count(input_channels)?;
        ensure_positive("sample rate", sample_rate)?;
        ensure_finite("rotation speed", params.rotation_speed)?;
        Ok(Self {
            params,
            sample_rate,
            input_channels: layout.count(),
            angle: 0.0,
            delay_line: vec![0.0; DELAY_FRAMES],
            write_index: 0,
            shadow_left: StateVariableFilter::new(),
            shadow_right: StateVariableFilter::new(),
        })
    }

    pub fn angle(&self) -> Sample {
        self.angle
    }

    fn read_delayed(&self, delay: Sample) -> Sample {
        let len = DELAY_FRAMES as Sample;
        let pos = (self.write_index as Sample - delay).rem_euclid(len);
        let i1 = (pos.floor() as usize).min(DELAY_FRAMES - 1);
        let i2 = (i1 + 1) % DELAY_FRAMES;
        lerp(self.delay_line[i1], self.delay_line[i2], pos - i1 as Sample)
    }

    /// Low-pass each ear by how far it sits in the head's shadow and how
    /// far behind the listener the source is
    fn head_shadow(&mut self, sin: Sample, cos: Sample, left: Sample, right: Sample) -> (Sample, Sample) {
        let back = ((1.0 - cos) * 0.5).clamp(0.0, 1.0);
        let shadow_l = sin.clamp(0.0, 1.0);
        let shadow_r = (-sin).clamp(0.0, 1.0);

        let cutoff_l = lerp(lerp(NORMAL_CUTOFF, SHADOW_CUTOFF, shadow_l), REAR_CUTOFF, back);
        let cutoff_r = lerp(lerp(NORMAL_CUTOFF, SHADOW_CUTOFF, shadow_r), REAR_CUTOFF, back);

        (
            self.shadow_left
                .process(left, cutoff_l, SHADOW_RESONANCE, FilterMode::LowPass),
            self.shadow_right
                .process(right, cutoff_r, SHADOW_RESONANCE, FilterMode::LowPass),
        )
    }

    fn process_frame(&mut self, input: Sample) -> (Sample, Sample) {
        let angle = self.angle;
        let (sin, cos) = angle.sin_cos();

        // Shortest angle to the median plane, so front and back share an ITD
        let azimuth = sin.atan2(cos.abs()).abs();
        let on_right = sin > 0.0;

        let itd = if self.params.woodworth_delay {
            woodworth_itd(azimuth, self.sample_rate)
        } else {
            simple_itd(angle, self.sample_rate)
        };
        let (delay_l, delay_r) = if on_right { (itd, 0.0) } else { (0.0, itd) };

        self.delay_line[self.write_index] = input;
        let mut left = self.read_delayed(delay_l);
        let mut right = self.read_delayed(delay_r);

        if self.params.head_shadow {
            (left, right) = self.head_shadow(sin, cos, left, right);
        }

        let pan = angle * 0.5 + FRAC_PI_4;
        left *= pan.cos().abs();
        right *= pan.sin().abs();

        self.write_index = (self.write_index + 1) % DELAY_FRAMES;
        (left, right)
    }
}

impl Effect for BinauralPanner {
    fn apply(&mut self, input: &[Sample], output: &mut Vec<Sample>) -> AmpResult<()> {
        let channels = self.input_channels;
        frame_count(input.len(), channels)?;
        let step = self.params.rotation_speed / self.sample_rate;

        output.clear();
        for frame in input.chunks_exact(channels) {
            let mono = match frame {
                [l, r] => downmix(*l, *r),
                _ => frame[0],
            };
            let (left, right) = self.process_frame(mono);
            output.push(left);
            output.push(right);

            self.angle = (self.angle + step).rem_euclid(TAU);
        }
        Ok(())
    }

    fn input_channels(&self) -> usize {
        self.input_channels
    }

    fn output_channels(&self) -> usize {
        2
    }

    fn reset(&mut self) {
        self.angle = 0.0;
        self.delay_line.fill(0.0);
        self.write_index = 0;
        self.shadow_left.reset();
        self.shadow_right.reset();
    }

    fn name(&self) -> &'static str {
        "binaural_rotation"
    }

    fn params_tag(&self) -> String {
        let p = &self.params;
        format!(
            "{:.2}_{:.2}_{:.2}",
            p.rotation_speed,
            if p.woodworth_delay { 1.0 } else { 0.0 },
            if p.head_shadow { 1.0 } else { 0.0 }
        )
    }
}
