// mediaseq - frame-sequence inspection and gap filling

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mediaseq::{
    parse_pattern, CanvasBackend, FillConfig, FillStrategy, FrameRange, ProbeBackend, Sequence,
    SequenceError, SequenceResolver,
};

#[derive(Parser)]
#[command(name = "mediaseq", version, about = "Inspect image sequences and fill missing frames")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show how a path encodes its frame number
    Parse {
        /// Path template (render.####.exr, render.%04d.exr or render.0101.exr)
        path: String,
    },
    /// Find the frame range of a sequence on disk
    Range { path: String },
    /// Print the fill plan for missing frames without writing anything
    Plan(FillArgs),
    /// Write substitutes for missing frames
    Fill(FillArgs),
}

#[derive(Args)]
struct FillArgs {
    path: String,

    #[arg(long, value_enum, default_value_t = FillStrategy::Previous)]
    strategy: FillStrategy,

    /// First frame of the requested range (defaults to the range on disk)
    #[arg(long, requires = "end")]
    start: Option<u64>,

    /// Last frame of the requested range
    #[arg(long, requires = "start")]
    end: Option<u64>,

    /// Earliest copy source and sizing reference frame
    #[arg(long)]
    start_number: Option<u64>,

    #[arg(long, value_enum, default_value_t = ProbeBackend::Decoder)]
    probe: ProbeBackend,

    #[arg(long, value_enum, default_value_t = CanvasBackend::Magick)]
    canvas: CanvasBackend,

    /// Fail when a missing frame has no earlier frame to copy
    #[arg(long)]
    strict: bool,
}

impl FillArgs {
    fn to_config(&self) -> Result<FillConfig> {
        let frame_range = match (self.start, self.end) {
            (Some(start), Some(end)) => Some(FrameRange::new(start, end)?),
            _ => None,
        };

        Ok(FillConfig {
            strategy: self.strategy,
            frame_range,
            start_number: self.start_number,
            probe: self.probe,
            canvas: self.canvas,
            strict: self.strict,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        // Not a sequence, or nothing on disk: skip quietly
        if let Some(seq) = e.downcast_ref::<SequenceError>() {
            if seq.is_skippable() {
                info!("Nothing to do: {}", seq);
                return Ok(());
            }
        }
        return Err(e);
    }
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Parse { path } => {
            let pattern = parse_pattern(&path)?;
            print_json(&pattern)
        }
        Command::Range { path } => {
            let sequence = Sequence::scan(&path)?;
            print_json(&sequence)
        }
        Command::Plan(args) => {
            let resolver = SequenceResolver::new(args.to_config()?);
            let resolved = resolver
                .plan(&args.path)
                .with_context(|| format!("Failed to plan fill for {}", args.path))?;
            warn_unresolved(&resolved.plan.unresolved);
            print_json(&resolved)
        }
        Command::Fill(args) => {
            let resolver = SequenceResolver::new(args.to_config()?);
            let (resolved, filled) = resolver
                .fill(&args.path)
                .with_context(|| format!("Failed to fill {}", args.path))?;
            warn_unresolved(&resolved.plan.unresolved);
            for path in filled.keep() {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

fn warn_unresolved(frames: &[u64]) {
    if !frames.is_empty() {
        warn!("Left unfilled, no earlier frame to copy: {:?}", frames);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
