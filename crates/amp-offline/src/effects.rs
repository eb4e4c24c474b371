//! Effect construction from configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use amp_dsp::bitcrusher::{DEFAULT_BIT_DEPTH, DEFAULT_DOWNSAMPLE};
use amp_dsp::overdrive::{DEFAULT_CAPACITANCE, DEFAULT_SERIES_RESISTANCE};
use amp_dsp::{
    BinauralPanner, BinauralParams, Bitcrusher, Cabinet, CabinetConfig, Effect, Overdrive,
    PitchShifter, StereoToMono, SweptFilter, SweptFilterParams, Wah, WahParams,
};
use amp_file::{load_impulse_response, Truncation};

use crate::error::RenderResult;

/// Default pitch factor (one octave up)
pub const DEFAULT_PITCH_FACTOR: f64 = 2.0;

/// An effect built from configuration, with what went wrong loading its data
pub struct BuiltEffect {
    pub effect: Box<dyn Effect>,
    /// Impulse response file and how far short of its header it ended
    pub ir_truncation: Option<(PathBuf, Truncation)>,
}

impl std::fmt::Debug for BuiltEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltEffect")
            .field("effect", &self.effect.name())
            .field("ir_truncation", &self.ir_truncation)
            .finish()
    }
}

fn default_resistance() -> f64 {
    DEFAULT_SERIES_RESISTANCE
}

fn default_capacitance() -> f64 {
    DEFAULT_CAPACITANCE
}

fn default_pitch_factor() -> f64 {
    DEFAULT_PITCH_FACTOR
}

fn default_bits() -> f64 {
    DEFAULT_BIT_DEPTH
}

fn default_downsample() -> f64 {
    DEFAULT_DOWNSAMPLE
}

/// One effect and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectConfig {
    /// Speaker cabinet convolution with an impulse response from disk
    Cabinet {
        ir_path: PathBuf,
        #[serde(default)]
        config: CabinetConfig,
    },
    SweptFilter(SweptFilterParams),
    Overdrive {
        /// Series resistance (ohms)
        #[serde(default = "default_resistance")]
        resistance: f64,
        /// Shunt capacitance (farads)
        #[serde(default = "default_capacitance")]
        capacitance: f64,
    },
    Wah(WahParams),
    PitchShift {
        #[serde(default = "default_pitch_factor")]
        factor: f64,
    },
    Binaural(BinauralParams),
    Bitcrusher {
        #[serde(default = "default_bits")]
        bits: f64,
        #[serde(default = "default_downsample")]
        downsample: f64,
    },
    StereoToMono,
}

impl EffectConfig {
    pub fn cabinet(ir_path: impl Into<PathBuf>) -> Self {
        Self::Cabinet {
            ir_path: ir_path.into(),
            config: CabinetConfig::default(),
        }
    }

    pub fn overdrive() -> Self {
        Self::Overdrive {
            resistance: DEFAULT_SERIES_RESISTANCE,
            capacitance: DEFAULT_CAPACITANCE,
        }
    }

    pub fn wah() -> Self {
        Self::Wah(WahParams::default())
    }

    pub fn pitch_shift(factor: f64) -> Self {
        Self::PitchShift { factor }
    }

    pub fn bitcrusher() -> Self {
        Self::Bitcrusher {
            bits: DEFAULT_BIT_DEPTH,
            downsample: DEFAULT_DOWNSAMPLE,
        }
    }

    /// Construct the effect for a stream with `channels` input channels
    pub fn build(
        &self,
        channels: usize,
        sample_rate: u32,
        block_frames: usize,
    ) -> RenderResult<Box<dyn Effect>> {
        Ok(self.build_effect(channels, sample_rate, block_frames)?.effect)
    }

    /// Like [`build`](Self::build), also reporting a truncated IR file
    pub fn build_effect(
        &self,
        channels: usize,
        sample_rate: u32,
        block_frames: usize,
    ) -> RenderResult<BuiltEffect> {
        let fs = f64::from(sample_rate);
        let mut ir_truncation = None;
        let effect: Box<dyn Effect> = match self {
            Self::Cabinet { ir_path, config } => {
                let load = load_impulse_response(ir_path)?;
                if load.ir.sample_rate != sample_rate {
                    log::warn!(
                        "IR {} is {} Hz but the input is {} Hz; the cabinet will sound shifted",
                        ir_path.display(),
                        load.ir.sample_rate,
                        sample_rate
                    );
                }
                ir_truncation = load.truncation.map(|t| (ir_path.clone(), t));
                Box::new(Cabinet::new(load.ir, channels, block_frames, *config)?)
            }
            Self::SweptFilter(params) => Box::new(SweptFilter::new(channels, fs, *params)?),
            Self::Overdrive {
                resistance,
                capacitance,
            } => Box::new(Overdrive::new(channels, fs, *resistance)?.with_capacitance(*capacitance)?),
            Self::Wah(params) => Box::new(Wah::new(channels, fs, *params)?),
            Self::PitchShift { factor } => Box::new(PitchShifter::new(channels, fs, *factor)?),
            Self::Binaural(params) => Box::new(BinauralPanner::new(channels, fs, *params)?),
            Self::Bitcrusher { bits, downsample } => {
                Box::new(Bitcrusher::new(channels, *bits, *downsample)?)
            }
            Self::StereoToMono => Box::new(StereoToMono::new()),
        };
        Ok(BuiltEffect {
            effect,
            ir_truncation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use amp_core::AmpError;

    #[test]
    fn test_build_sets_channels() {
        let od = EffectConfig::overdrive().build(2, 48000, 256).unwrap();
        assert_eq!(od.name(), "overdrive");
        assert_eq!(od.input_channels(), 2);

        let panner = EffectConfig::Binaural(BinauralParams::default())
            .build(1, 48000, 256)
            .unwrap();
        assert_eq!(panner.output_channels(), 2);

        let mono = EffectConfig::StereoToMono.build(2, 48000, 256).unwrap();
        assert_eq!(mono.output_channels(), 1);
    }

    #[test]
    fn test_invalid_params_surface() {
        assert!(matches!(
            EffectConfig::pitch_shift(-1.0).build(1, 48000, 256),
            Err(RenderError::Dsp(AmpError::InvalidParam(_)))
        ));
        assert!(EffectConfig::wah().build(4, 48000, 256).is_err());
    }

    #[test]
    fn test_out_of_range_json_params_rejected() {
        let configs = [
            r#"{"type":"overdrive","resistance":0.0}"#,
            r#"{"type":"overdrive","capacitance":-1e-9}"#,
            r#"{"type":"swept_filter","start_cutoff_hz":0.0}"#,
            r#"{"type":"wah","end_cutoff_hz":96000.0}"#,
            r#"{"type":"bitcrusher","bits":4096.0,"downsample":8.0}"#,
        ];
        for json in configs {
            let effect: EffectConfig = serde_json::from_str(json).unwrap();
            assert!(
                matches!(
                    effect.build(1, 48000, 256),
                    Err(RenderError::Dsp(AmpError::InvalidParam(_)))
                ),
                "{json}"
            );
        }
    }

    #[test]
    fn test_missing_ir_is_file_error() {
        let result = EffectConfig::cabinet("/nonexistent/cab.wav").build(1, 48000, 256);
        assert!(matches!(result, Err(RenderError::File(_))));
    }

    #[test]
    fn test_tagged_json() {
        let json = serde_json::to_string(&EffectConfig::pitch_shift(0.5)).unwrap();
        assert_eq!(json, r#"{"type":"pitch_shift","factor":0.5}"#);

        let back: EffectConfig = serde_json::from_str(r#"{"type":"stereo_to_mono"}"#).unwrap();
        assert_eq!(back, EffectConfig::StereoToMono);
    }
}
