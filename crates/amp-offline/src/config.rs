//! Render configuration

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use amp_file::BitDepth;

use crate::effects::EffectConfig;
use crate::error::{RenderError, RenderResult};

/// Frames per block pulled from the source
pub const DEFAULT_BLOCK_FRAMES: usize = 4096;

/// Offline render configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Block size for processing (frames per block)
    pub block_frames: usize,

    /// Output sample format
    pub bit_depth: BitDepth,

    /// Keep rendering silence until every effect tail has decayed
    pub ring_out: bool,

    /// Effects in processing order
    pub effects: Vec<EffectConfig>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            block_frames: DEFAULT_BLOCK_FRAMES,
            bit_depth: BitDepth::Float32,
            ring_out: false,
            effects: Vec::new(),
        }
    }
}

impl RenderConfig {
    pub fn with_block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames;
        self
    }

    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn with_ring_out(mut self, ring_out: bool) -> Self {
        self.ring_out = ring_out;
        self
    }

    /// Append an effect to the end of the chain
    pub fn with_effect(mut self, effect: EffectConfig) -> Self {
        self.effects.push(effect);
        self
    }

    /// Check values that would only fail once rendering starts
    pub fn validate(&self) -> RenderResult<()> {
        if self.block_frames == 0 {
            return Err(RenderError::InvalidConfig(
                "block_frames must be at least 1".to_string(),
            ));
        }
        if self.effects.is_empty() {
            log::warn!("no effects configured; input will be copied through");
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> RenderResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> RenderResult<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> RenderResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amp_dsp::svf::FilterMode;
    use amp_dsp::{CabinetConfig, SweptFilterParams};
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.block_frames, 4096);
        assert_eq!(config.bit_depth, BitDepth::Float32);
        assert!(!config.ring_out);
        assert!(config.effects.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "ring_out": true,
            "effects": [
                { "type": "overdrive" },
                { "type": "cabinet", "ir_path": "cab.wav", "config": { "fade_out_samples": 0 } },
                { "type": "swept_filter", "mode": { "band_shelving": 0.25 } },
                { "type": "bitcrusher", "bits": 8 }
            ]
        }"#;
        let config = RenderConfig::from_json_str(json).unwrap();

        assert!(config.ring_out);
        assert_eq!(config.block_frames, DEFAULT_BLOCK_FRAMES);
        assert_eq!(config.effects.len(), 4);
        assert_eq!(config.effects[0], EffectConfig::overdrive());
        match &config.effects[1] {
            EffectConfig::Cabinet { ir_path, config } => {
                assert_eq!(ir_path.to_str(), Some("cab.wav"));
                assert_eq!(config.fade_out_samples, 0);
                assert_eq!(config.normalize_peak, CabinetConfig::default().normalize_peak);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &config.effects[2] {
            EffectConfig::SweptFilter(params) => {
                assert_eq!(params.mode, FilterMode::BandShelving(0.25));
                assert_eq!(params.end_cutoff_hz, SweptFilterParams::default().end_cutoff_hz);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            config.effects[3],
            EffectConfig::Bitcrusher {
                bits: 8.0,
                downsample: amp_dsp::bitcrusher::DEFAULT_DOWNSAMPLE
            }
        );
    }

    #[test]
    fn test_zero_block_rejected() {
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "block_frames": 0 }"#),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_effect_rejected() {
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "effects": [{ "type": "flanger" }] }"#),
            Err(RenderError::Json(_))
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("render.json");
        let config = RenderConfig::default()
            .with_block_frames(512)
            .with_bit_depth(BitDepth::Int24)
            .with_effect(EffectConfig::wah())
            .with_effect(EffectConfig::StereoToMono);

        config.to_json_file(&path).unwrap();
        assert_eq!(RenderConfig::from_json_file(&path).unwrap(), config);
    }
}
