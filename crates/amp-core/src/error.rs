//! Error types for the amp simulator core

use std::ops::RangeInclusive;

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum AmpError {
    #[error("Impulse response is empty")]
    EmptyImpulseResponse,

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("Block too large: at most {max} samples per call, got {got}")]
    BlockTooLarge { max: usize, got: usize },

    #[error("Block of {len} samples is not a whole number of {channels}-channel frames")]
    MisalignedBlock { len: usize, channels: usize },

    #[error("Channel mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },

    #[error("Effect '{effect}' produced {got} samples, expected {expected}")]
    OutputLength {
        effect: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Stream already ended with a short block; reset before processing more input")]
    StreamEnded,

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("DSP error: {0}")]
    Dsp(String),
}

/// Result type alias
pub type AmpResult<T> = Result<T, AmpError>;

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Reject `value` unless it is finite and greater than zero
pub fn ensure_positive(name: &str, value: f64) -> AmpResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AmpError::InvalidParam(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

/// Reject NaN and infinities
pub fn ensure_finite(name: &str, value: f64) -> AmpResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AmpError::InvalidParam(format!("{name} must be finite, got {value}")))
    }
}

/// Reject `value` outside `range`
pub fn ensure_in_range(name: &str, value: f64, range: RangeInclusive<f64>) -> AmpResult<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(AmpError::InvalidParam(format!(
            "{name} must lie in {}..={}, got {value}",
            range.start(),
            range.end()
        )))
    }
}
