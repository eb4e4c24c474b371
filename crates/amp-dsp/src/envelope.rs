//! Attack/release envelope follower

use amp_core::Sample;

/// Default attack time (ms)
pub const DEFAULT_ATTACK_MS: Sample = 10.0;

/// Default release time (ms)
pub const DEFAULT_RELEASE_MS: Sample = 100.0;

/// One-pole peak envelope detector for a single channel
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    sample_rate: Sample,
    envelope: Sample,
    attack_coef: Sample,
    release_coef: Sample,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: Sample) -> Self {
        let mut follower = Self {
            sample_rate,
            envelope: 0.0,
            attack_coef: 0.0,
            release_coef: 0.0,
        };
        follower.set_params(DEFAULT_ATTACK_MS, DEFAULT_RELEASE_MS);
        follower
    }

    /// Set attack and release times in milliseconds. A time of zero or
    /// less makes that phase instantaneous.
    pub fn set_params(&mut self, attack_ms: Sample, release_ms: Sample) {
        self.attack_coef = self.coefficient(attack_ms / 1000.0);
        self.release_coef = self.coefficient(release_ms / 1000.0);
    }

    fn coefficient(&self, seconds: Sample) -> Sample {
        if seconds > 0.0 {
            (-1.0 / (seconds * self.sample_rate)).exp()
        } else {
            0.0
        }
    }

    #[inline]
    pub fn process(&mut self, input: Sample) -> Sample {
        let level = input.abs();
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;
        self.envelope
    }

    #[inline]
    pub fn envelope(&self) -> Sample {
        self.envelope
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
