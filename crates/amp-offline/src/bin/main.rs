//! ampsim: render audio files through the amp effect chain
//!
//! Usage:
//!   ampsim render in.wav out.wav --overdrive --cabinet cab.wav
//!   ampsim render in.wav --config chain.json --output-root renders/
//!   ampsim info in.wav cab.wav

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use amp_dsp::svf::FilterMode;
use amp_dsp::{BinauralParams, SweptFilterParams};
use amp_file::{get_audio_info, BitDepth};
use amp_offline::{EffectConfig, RenderConfig, RenderPipeline};

#[derive(Parser)]
#[command(name = "ampsim", version, about = "Offline guitar amp simulator")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a WAV file through an effect chain
    Render(RenderArgs),
    /// Print WAV file metadata
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// Source WAV file
    input: PathBuf,

    /// Destination WAV file
    output: Option<PathBuf>,

    /// Render configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write to <root>/<effects>/<audio>/<params>/audio.wav when no output is given
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Save the effective configuration as JSON
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Swept state-variable filter in the given mode (e.g. band_pass, band_shelving:0.5)
    #[arg(long, value_name = "MODE")]
    filter: Option<FilterMode>,

    /// Diode clipper overdrive
    #[arg(long)]
    overdrive: bool,

    /// Envelope-driven wah
    #[arg(long)]
    wah: bool,

    /// Cabinet impulse response
    #[arg(long, value_name = "IR")]
    cabinet: Option<PathBuf>,

    /// Pitch shift by a frequency ratio
    #[arg(long, value_name = "FACTOR")]
    pitch: Option<f64>,

    /// Bit-depth and sample-rate reduction
    #[arg(long)]
    bitcrush: bool,

    /// Rotating binaural panner (stereo output)
    #[arg(long)]
    binaural: bool,

    /// Downmix stereo input to mono first
    #[arg(long)]
    mono: bool,

    /// Frames per processing block
    #[arg(short, long)]
    block_size: Option<usize>,

    /// Render effect tails past the end of the input
    #[arg(long)]
    ring_out: bool,

    /// Output sample format: 16, 24, 32 or 32f
    #[arg(long)]
    bit_depth: Option<BitDepth>,
}

impl RenderArgs {
    fn has_inline_effects(&self) -> bool {
        self.filter.is_some()
            || self.overdrive
            || self.wah
            || self.cabinet.is_some()
            || self.pitch.is_some()
            || self.bitcrush
            || self.binaural
            || self.mono
    }

    /// Inline effects in their fixed chain order
    fn inline_effects(&self) -> Vec<EffectConfig> {
        let mut effects = Vec::new();
        if self.mono {
            effects.push(EffectConfig::StereoToMono);
        }
        if let Some(mode) = self.filter {
            effects.push(EffectConfig::SweptFilter(SweptFilterParams {
                mode,
                ..SweptFilterParams::default()
            }));
        }
        if self.overdrive {
            effects.push(EffectConfig::overdrive());
        }
        if self.wah {
            effects.push(EffectConfig::wah());
        }
        if let Some(ir) = &self.cabinet {
            effects.push(EffectConfig::cabinet(ir.clone()));
        }
        if let Some(factor) = self.pitch {
            effects.push(EffectConfig::pitch_shift(factor));
        }
        if self.bitcrush {
            effects.push(EffectConfig::bitcrusher());
        }
        if self.binaural {
            effects.push(EffectConfig::Binaural(BinauralParams::default()));
        }
        effects
    }

    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => {
                if self.has_inline_effects() {
                    bail!("effect flags cannot be combined with --config");
                }
                RenderConfig::from_json_file(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            }
            None => RenderConfig {
                effects: self.inline_effects(),
                ..RenderConfig::default()
            },
        };

        if let Some(frames) = self.block_size {
            config.block_frames = frames;
        }
        if let Some(bit_depth) = self.bit_depth {
            config.bit_depth = bit_depth;
        }
        config.ring_out |= self.ring_out;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Render(args) => render(&args),
        Commands::Info { files } => {
            for file in &files {
                print_info(file)?;
            }
            Ok(())
        }
    }
}

fn render(args: &RenderArgs) -> Result<()> {
    let config = args.render_config()?;
    if let Some(path) = &args.save_config {
        config
            .to_json_file(path)
            .with_context(|| format!("Failed to save config {}", path.display()))?;
        log::info!("saved config to {}", path.display());
    }

    let pipeline = RenderPipeline::new(config).context("Invalid render configuration")?;

    let (output, report) = match (&args.output, &args.output_root) {
        (Some(output), _) => {
            let report = pipeline
                .render(&args.input, output)
                .with_context(|| format!("Failed to render {}", args.input.display()))?;
            (output.clone(), report)
        }
        (None, Some(root)) => pipeline
            .render_to_root(&args.input, root)
            .with_context(|| format!("Failed to render {}", args.input.display()))?,
        (None, None) => bail!("either an output file or --output-root is required"),
    };

    println!(
        "{} -> {}: {} ch -> {} ch, {:.2}s, peak {:.3} [{}]",
        args.input.display(),
        output.display(),
        report.input_channels,
        report.output_channels,
        report.duration(),
        report.peak,
        report.effects.join(" -> ")
    );
    if report.input_truncated {
        println!("warning: input was shorter than its header states");
    }
    for ir in &report.truncated_irs {
        println!("warning: impulse response {} was shorter than its header states", ir.display());
    }
    Ok(())
}

fn print_info(path: &Path) -> Result<()> {
    let info = get_audio_info(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}", path.display());
    println!("  channels:    {}", info.channels);
    println!("  sample rate: {} Hz", info.sample_rate);
    println!("  format:      {:?}", info.bit_depth);
    println!("  frames:      {}", info.num_frames);
    println!("  duration:    {:.3}s", info.duration);
    println!("  size:        {} bytes", info.file_size);
    Ok(())
}
