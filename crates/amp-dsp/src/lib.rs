//! amp-dsp: Effect processors for the amp simulator
//!
//! ## Modules
//! - `fft` - Real FFT wrapper and spectral multiply-accumulate
//! - `partition` - Impulse response split into frequency-domain partitions
//! - `fdl` - Frequency-domain delay line of past input spectra
//! - `convolution` - Uniform partitioned overlap-save convolver
//! - `cabinet` - Speaker cabinet effect built on the convolver
//! - `chain` - `Effect` trait and ordered effect chain
//! - `svf` - State-variable filter and LFO-swept filter effect
//! - `envelope` - Attack/release envelope follower
//! - `overdrive` - Wave-digital diode clipper
//! - `wah` - Auto-wah
//! - `pitch` - Granular pitch shifter
//! - `binaural` - Rotating binaural panner
//! - `bitcrusher` - Bit-depth and sample-rate reduction
//! - `downmix` - Stereo to mono

pub mod binaural;
pub mod bitcrusher;
pub mod cabinet;
pub mod chain;
pub mod convolution;
pub mod downmix;
pub mod envelope;
pub mod fdl;
pub mod fft;
pub mod overdrive;
pub mod partition;
pub mod pitch;
pub mod svf;
pub mod wah;

pub use binaural::{BinauralPanner, BinauralParams};
pub use bitcrusher::Bitcrusher;
pub use cabinet::{Cabinet, CabinetConfig};
pub use chain::{Effect, EffectChain};
pub use convolution::PartitionedConvolver;
pub use downmix::StereoToMono;
pub use envelope::EnvelopeFollower;
pub use fdl::FrequencyDelayLine;
pub use fft::FrequencyTransform;
pub use overdrive::Overdrive;
pub use partition::PartitionedIr;
pub use pitch::PitchShifter;
pub use svf::{FilterMode, StateVariableFilter, SweptFilter, SweptFilterParams};
pub use wah::{Wah, WahParams};
