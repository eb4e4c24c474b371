//! Offline render pipeline
//!
//! Pulls fixed-size blocks from a WAV source, runs them through the
//! effect chain and writes each processed block before reading the next:
//! 1. Open the source and read its header
//! 2. Build the effect chain for the source's channels and rate
//! 3. Create the output file
//! 4. Read, process, write until the source is exhausted
//! 5. Optionally render the chain's tail on silence

use std::fs;
use std::path::{Path, PathBuf};

use amp_core::{peak, Sample};
use amp_dsp::EffectChain;
use amp_file::{WavBlockReader, WavBlockWriter};

use crate::config::RenderConfig;
use crate::error::RenderResult;
use crate::naming;

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Summary of one render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Frames read from the source
    pub input_frames: u64,
    /// Frames written to the output
    pub output_frames: u64,
    pub input_channels: usize,
    pub output_channels: usize,
    pub sample_rate: u32,
    /// Blocks run through the chain
    pub blocks: u64,
    /// Absolute peak of the output
    pub peak: Sample,
    /// Effect names in processing order
    pub effects: Vec<String>,
    /// Source data ended before its header's stated length
    pub input_truncated: bool,
    /// Impulse response files that ended before their header's stated length
    pub truncated_irs: Vec<PathBuf>,
}

impl RenderReport {
    /// Output duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.output_frames as f64 / self.sample_rate as f64
        }
    }
}

#[derive(Debug, Default)]
struct BlockStats {
    input_frames: u64,
    output_frames: u64,
    blocks: u64,
    peak: Sample,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Block-pull renderer for one configuration
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    config: RenderConfig,
}

impl RenderPipeline {
    pub fn new(config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Build the configured chain for a `channels`-channel stream
    pub fn build_chain(&self, channels: usize, sample_rate: u32) -> RenderResult<EffectChain> {
        Ok(self.assemble(channels, sample_rate)?.0)
    }

    /// Build the chain and collect the IR files that loaded truncated
    fn assemble(&self, channels: usize, sample_rate: u32) -> RenderResult<(EffectChain, Vec<PathBuf>)> {
        let block_frames = self.config.block_frames;
        let mut chain = EffectChain::new(block_frames, channels)?;
        let mut truncated_irs = Vec::new();
        for effect in &self.config.effects {
            let built = effect.build_effect(chain.output_channels(), sample_rate, block_frames)?;
            if let Some((path, _)) = built.ir_truncation {
                truncated_irs.push(path);
            }
            chain.push_boxed(built.effect)?;
        }

        log::info!(
            "chain [{}]: {} -> {} ch, {} frames per block, tail {} frames",
            chain.names().join(" -> "),
            chain.input_channels(),
            chain.output_channels(),
            block_frames,
            chain.tail_frames()
        );
        Ok((chain, truncated_irs))
    }

    /// Render `input` to `output`
    pub fn render(&self, input: &Path, output: &Path) -> RenderResult<RenderReport> {
        let mut reader = WavBlockReader::open(input)?;
        let (mut chain, truncated_irs) = self.assemble(reader.channels(), reader.sample_rate())?;
        self.render_with(&mut reader, &mut chain, output, truncated_irs)
    }

    /// Render `input` into the derived output path under `root`.
    ///
    /// Returns the path written.
    pub fn render_to_root(&self, input: &Path, root: &Path) -> RenderResult<(PathBuf, RenderReport)> {
        let mut reader = WavBlockReader::open(input)?;
        let (mut chain, truncated_irs) = self.assemble(reader.channels(), reader.sample_rate())?;
        let output = naming::output_path(root, chain.effects(), input);
        let report = self.render_with(&mut reader, &mut chain, &output, truncated_irs)?;
        Ok((output, report))
    }

    fn render_with(
        &self,
        reader: &mut WavBlockReader,
        chain: &mut EffectChain,
        output: &Path,
        truncated_irs: Vec<PathBuf>,
    ) -> RenderResult<RenderReport> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = WavBlockWriter::create(
            output,
            chain.output_channels(),
            reader.sample_rate(),
            self.config.bit_depth,
        )?;

        log::info!(
            "rendering {} frames @ {} Hz to {}",
            reader.total_frames(),
            reader.sample_rate(),
            output.display()
        );

        let stats = self.drive(
            chain,
            |buf, frames| Ok(reader.read_block(buf, frames)?),
            |block| Ok(writer.write_block(block)?),
        )?;
        writer.finalize()?;

        let report = RenderReport {
            input_frames: stats.input_frames,
            output_frames: stats.output_frames,
            input_channels: chain.input_channels(),
            output_channels: chain.output_channels(),
            sample_rate: reader.sample_rate(),
            blocks: stats.blocks,
            peak: stats.peak,
            effects: chain.names().iter().map(|n| n.to_string()).collect(),
            input_truncated: reader.is_truncated(),
            truncated_irs,
        };
        if report.peak > 1.0 {
            log::warn!("output peak {:.3} exceeds full scale", report.peak);
        }
        log::info!(
            "wrote {} frames in {} blocks, peak {:.3}",
            report.output_frames,
            report.blocks,
            report.peak
        );
        Ok(report)
    }

    /// Render interleaved samples held in memory
    pub fn render_samples(
        &self,
        samples: &[Sample],
        channels: usize,
        sample_rate: u32,
    ) -> RenderResult<Vec<Sample>> {
        let mut chain = self.build_chain(channels, sample_rate)?;
        let mut rendered = Vec::new();
        let mut pos = 0;

        self.drive(
            &mut chain,
            |buf, frames| {
                let end = (pos + frames * channels).min(samples.len());
                buf.clear();
                buf.extend_from_slice(&samples[pos..end]);
                pos = end;
                Ok(buf.len() / channels)
            },
            |block| {
                rendered.extend_from_slice(block);
                Ok(())
            },
        )?;
        Ok(rendered)
    }

    /// The block loop shared by every source and sink
    fn drive<R, W>(&self, chain: &mut EffectChain, mut read: R, mut write: W) -> RenderResult<BlockStats>
    where
        R: FnMut(&mut Vec<Sample>, usize) -> RenderResult<usize>,
        W: FnMut(&[Sample]) -> RenderResult<()>,
    {
        let block_frames = self.config.block_frames;
        let ring_out = self.config.ring_out;
        let tail = if ring_out { chain.tail_frames() as u64 } else { 0 };
        let in_channels = chain.input_channels();
        let out_channels = chain.output_channels();
        let mut input = Vec::with_capacity(block_frames * in_channels);
        let mut stats = BlockStats::default();

        loop {
            let frames = read(&mut input, block_frames)?;
            if frames == 0 {
                break;
            }
            stats.input_frames += frames as u64;
            let last = frames < block_frames;

            // A short block ends the stream. Ring-out pads it instead so the
            // tail can follow on silent blocks.
            if last && ring_out {
                input.resize(block_frames * in_channels, 0.0);
            }

            let block = chain.process(&input)?;
            stats.blocks += 1;
            let limit = (last && ring_out).then_some(stats.input_frames + tail);
            emit(block, out_channels, limit, &mut stats, &mut write)?;

            if last {
                break;
            }
        }

        if ring_out && stats.input_frames > 0 {
            let target = stats.input_frames + tail;
            let silence = vec![0.0; block_frames * in_channels];
            while stats.output_frames < target {
                let block = chain.process(&silence)?;
                stats.blocks += 1;
                emit(block, out_channels, Some(target), &mut stats, &mut write)?;
            }
        }
        Ok(stats)
    }
}

/// Write `block`, stopping once `limit` output frames have been written
fn emit<W>(
    block: &[Sample],
    channels: usize,
    limit: Option<u64>,
    stats: &mut BlockStats,
    write: &mut W,
) -> RenderResult<()>
where
    W: FnMut(&[Sample]) -> RenderResult<()>,
{
    let frames = block.len() / channels;
    let keep = match limit {
        Some(limit) => (limit.saturating_sub(stats.output_frames) as usize).min(frames),
        None => frames,
    };
    let kept = &block[..keep * channels];
    stats.peak = stats.peak.max(peak(kept));
    write(kept)?;
    stats.output_frames += keep as u64;
    Ok(())
}
