//! File I/O error types

use amp_core::AmpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Write error: {0}")]
    WriteError(String),

    #[error("WAV error: {0}")]
    WavError(String),

    #[error(transparent)]
    Core(#[from] AmpError),
}

pub type FileResult<T> = Result<T, FileError>;

impl From<hound::Error> for FileError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => FileError::Io(e),
            hound::Error::Unsupported => {
                FileError::UnsupportedFormat("WAV encoding not supported".to_string())
            }
            other => FileError::WavError(other.to_string()),
        }
    }
}
