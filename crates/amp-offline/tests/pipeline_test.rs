//! Render pipeline tests
//!
//! End-to-end renders through temporary WAV files:
//! - block-pull loop output length with and without ring-out
//! - cabinet output against the in-memory chain
//! - channel changes through the chain
//! - configuration errors abort before any output exists

use std::fs::OpenOptions;
use std::path::Path;

use approx::assert_abs_diff_eq;
use tempfile::tempdir;

use amp_core::Sample;
use amp_dsp::CabinetConfig;
use amp_file::{read_wav, write_wav, AudioData, BitDepth};
use amp_offline::{EffectConfig, RenderConfig, RenderError, RenderPipeline};

const SAMPLE_RATE: u32 = 48000;

fn write_source(path: &Path, frames: usize, channels: usize) -> Vec<Sample> {
    let samples: Vec<Sample> = (0..frames * channels)
        .map(|i| ((i / channels) as Sample * 0.03).sin() * 0.5)
        .collect();
    let data = AudioData::from_interleaved(&samples, channels, SAMPLE_RATE);
    write_wav(path, &data, BitDepth::Float32).unwrap();
    samples
}

fn write_ir(path: &Path, taps: &[Sample]) {
    let data = AudioData::from_interleaved(taps, 1, SAMPLE_RATE);
    write_wav(path, &data, BitDepth::Float32).unwrap();
}

fn raw_cabinet(ir: &Path) -> EffectConfig {
    EffectConfig::Cabinet {
        ir_path: ir.to_path_buf(),
        config: CabinetConfig::raw(),
    }
}

#[test]
fn test_render_without_ring_out_keeps_length() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let ir = dir.path().join("cab.wav");
    let output = dir.path().join("out.wav");
    write_source(&input, 1000, 1);
    write_ir(&ir, &[0.5; 300]);

    let config = RenderConfig::default()
        .with_block_frames(256)
        .with_effect(raw_cabinet(&ir));
    let report = RenderPipeline::new(config)
        .unwrap()
        .render(&input, &output)
        .unwrap();

    assert_eq!(report.input_frames, 1000);
    assert_eq!(report.output_frames, 1000);
    assert_eq!(report.blocks, 4);
    assert_eq!(report.effects, vec!["cabinet".to_string()]);
    assert_eq!(read_wav(&output).unwrap().num_frames(), 1000);
    assert!(report.truncated_irs.is_empty());
}

#[test]
fn test_truncated_ir_reported() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let ir = dir.path().join("cab.wav");
    let output = dir.path().join("out.wav");
    write_source(&input, 512, 1);
    write_ir(&ir, &[0.1; 400]);

    // Cut 100 float frames from the data, header untouched
    let file = OpenOptions::new().write(true).open(&ir).unwrap();
    let len = file.metadata().unwrap().len();
    file.set_len(len - 400).unwrap();
    drop(file);

    let config = RenderConfig::default()
        .with_block_frames(128)
        .with_effect(raw_cabinet(&ir));
    let report = RenderPipeline::new(config)
        .unwrap()
        .render(&input, &output)
        .unwrap();

    assert_eq!(report.truncated_irs, vec![ir.clone()]);
    assert!(!report.input_truncated);
    assert_eq!(report.output_frames, 512);
}

#[test]
fn test_ring_out_renders_tail() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let ir = dir.path().join("cab.wav");
    let output = dir.path().join("out.wav");
    write_source(&input, 1000, 2);
    write_ir(&ir, &[0.25; 300]);

    let config = RenderConfig::default()
        .with_block_frames(256)
        .with_ring_out(true)
        .with_effect(raw_cabinet(&ir));
    let report = RenderPipeline::new(config)
        .unwrap()
        .render(&input, &output)
        .unwrap();

    assert_eq!(report.output_frames, 1000 + 299);
    assert_eq!(report.output_channels, 2);

    let rendered = read_wav(&output).unwrap();
    assert_eq!(rendered.num_frames(), 1299);
    // Tail still sounds after the input ends
    assert!(rendered.channels[0][1000..1200].iter().any(|s| s.abs() > 1e-3));
}

#[test]
fn test_file_render_matches_in_memory_render() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let ir = dir.path().join("cab.wav");
    let output = dir.path().join("out.wav");
    let source = write_source(&input, 2048, 1);
    let taps: Vec<Sample> = (0..500).map(|i| 0.99_f64.powi(i) * 0.3).collect();
    write_ir(&ir, &taps);

    let config = RenderConfig::default()
        .with_block_frames(512)
        .with_effect(EffectConfig::cabinet(&ir));
    let pipeline = RenderPipeline::new(config).unwrap();

    pipeline.render(&input, &output).unwrap();
    let expected = pipeline.render_samples(&source, 1, SAMPLE_RATE).unwrap();
    let rendered = read_wav(&output).unwrap();

    assert_eq!(rendered.channels[0].len(), expected.len());
    for (a, b) in rendered.channels[0].iter().zip(&expected) {
        // Source and output both pass through 32-bit float
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
    }
}

#[test]
fn test_mono_input_binaural_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_source(&input, 4096, 1);

    let config = RenderConfig::default()
        .with_bit_depth(BitDepth::Int16)
        .with_effect(EffectConfig::overdrive())
        .with_effect(EffectConfig::Binaural(Default::default()));
    let report = RenderPipeline::new(config)
        .unwrap()
        .render(&input, &output)
        .unwrap();

    assert_eq!(report.input_channels, 1);
    assert_eq!(report.output_channels, 2);
    let rendered = read_wav(&output).unwrap();
    assert_eq!(rendered.num_channels(), 2);
    assert_eq!(rendered.bit_depth, BitDepth::Int16);
}

#[test]
fn test_render_to_root_derives_path() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("riff.wav");
    write_source(&input, 512, 2);

    let config = RenderConfig::default()
        .with_effect(EffectConfig::StereoToMono)
        .with_effect(EffectConfig::overdrive());
    let root = dir.path().join("output");
    let (path, report) = RenderPipeline::new(config)
        .unwrap()
        .render_to_root(&input, &root)
        .unwrap();

    assert_eq!(
        path,
        root.join("stereo_to_mono+overdrive/riff/default-params+default-params/audio.wav")
    );
    assert!(path.exists());
    assert_eq!(report.output_channels, 1);
}

#[test]
fn test_bad_chain_aborts_before_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_source(&input, 256, 1);

    // Mono input cannot feed a stereo downmix
    let config = RenderConfig::default().with_effect(EffectConfig::StereoToMono);
    let result = RenderPipeline::new(config).unwrap().render(&input, &output);

    assert!(matches!(result, Err(RenderError::Dsp(_))));
    assert!(!output.exists());
}

#[test]
fn test_missing_ir_aborts_before_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_source(&input, 256, 1);

    let config = RenderConfig::default().with_effect(EffectConfig::cabinet(dir.path().join("nope.wav")));
    let result = RenderPipeline::new(config).unwrap().render(&input, &output);

    assert!(matches!(result, Err(RenderError::File(_))));
    assert!(!output.exists());
}

#[test]
fn test_empty_chain_copies_input() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    let source = write_source(&input, 300, 2);

    RenderPipeline::new(RenderConfig::default().with_block_frames(128))
        .unwrap()
        .render(&input, &output)
        .unwrap();

    let rendered = read_wav(&output).unwrap().to_interleaved();
    assert_eq!(rendered.len(), source.len());
    for (a, b) in rendered.iter().zip(&source) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }
}
