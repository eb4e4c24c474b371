//! amp-file: Audio File I/O
//!
//! WAV import/export via hound:
//! - whole-file read/write with 8/16/24/32-bit integer and 32-bit float
//! - streaming block reader and writer for the render loop
//! - impulse response loading with truncation reporting

mod audio_file;
mod error;
mod impulse;

pub use audio_file::*;
pub use error::*;
pub use impulse::*;
