//! amp-core: Shared types, traits, and utilities for the amp simulator
//!
//! This crate provides the foundational types used across all amp-* crates:
//! the sample type, interleaving helpers, the impulse response data model
//! and the core error type.

mod error;
mod impulse;
mod sample;

pub use error::*;
pub use impulse::*;
pub use sample::*;

/// Channel configuration of an interleaved stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    #[inline]
    pub fn count(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    pub fn from_count(channels: usize) -> AmpResult<Self> {
        match channels {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            other => Err(AmpError::InvalidParam(format!(
                "unsupported channel count {other} (expected 1 or 2)"
            ))),
        }
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::Stereo
    }
}

/// Validate a processing block size (frames per block)
pub fn validate_block_size(block_size: usize) -> AmpResult<usize> {
    if block_size == 0 {
        return Err(AmpError::InvalidBlockSize(block_size));
    }
    if !block_size.is_power_of_two() {
        log::debug!("block size {block_size} is not a power of two; FFTs will be slower");
    }
    Ok(block_size)
}
