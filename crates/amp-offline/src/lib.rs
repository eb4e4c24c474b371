//! amp-offline: Offline render pipeline
//!
//! Renders WAV files through a configured effect chain:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       RenderPipeline                         │
//! │                                                              │
//! │  ┌────────────┐   ┌──────────────────────┐   ┌────────────┐  │
//! │  │ WAV block  │ → │ EffectChain          │ → │ WAV block  │  │
//! │  │ reader     │   │ (filter, drive, cab) │   │ writer     │  │
//! │  └────────────┘   └──────────────────────┘   └────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use amp_offline::{EffectConfig, RenderConfig, RenderPipeline};
//!
//! let config = RenderConfig::default()
//!     .with_effect(EffectConfig::overdrive())
//!     .with_effect(EffectConfig::cabinet("/path/to/cab.wav"))
//!     .with_ring_out(true);
//!
//! let report = RenderPipeline::new(config)?
//!     .render("guitar.wav".as_ref(), "out.wav".as_ref())?;
//! ```

mod config;
mod effects;
mod error;
pub mod naming;
mod pipeline;

pub use config::*;
pub use effects::*;
pub use error::*;
pub use pipeline::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
