//! Error types for offline rendering

use amp_core::AmpError;
use amp_file::FileError;
use thiserror::Error;

/// Offline rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("DSP error: {0}")]
    Dsp(#[from] AmpError),

    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Configuration error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for offline operations
pub type RenderResult<T> = Result<T, RenderError>;
