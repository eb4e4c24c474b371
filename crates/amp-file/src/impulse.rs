//! Impulse response loading

use std::path::Path;

use amp_core::{AmpError, ImpulseResponse};

use crate::audio_file::{read_wav_checked, Truncation};
use crate::FileResult;

/// A loaded impulse response and how completely it was read
#[derive(Debug, Clone)]
pub struct IrLoad {
    pub ir: ImpulseResponse,
    /// Set when the file held fewer frames than its header states
    pub truncation: Option<Truncation>,
}

impl IrLoad {
    pub fn is_complete(&self) -> bool {
        self.truncation.is_none()
    }
}

/// Read a WAV file as an impulse response.
///
/// A truncated file still loads with whatever frames were present; the
/// shortfall is logged and recorded in [`IrLoad::truncation`].
pub fn load_impulse_response<P: AsRef<Path>>(path: P) -> FileResult<IrLoad> {
    let path = path.as_ref();
    let (data, truncation) = read_wav_checked(path)?;
    if data.num_frames() == 0 {
        return Err(AmpError::EmptyImpulseResponse.into());
    }

    let ir = ImpulseResponse::new(data.channels, data.sample_rate)?;
    log::debug!(
        "loaded IR {}: {} ch, {} samples @ {} Hz",
        path.display(),
        ir.num_channels(),
        ir.len(),
        ir.sample_rate
    );
    Ok(IrLoad { ir, truncation })
}
