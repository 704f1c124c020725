//! Frequalizer offline tool
//!
//! Usage:
//!   fq-render render <in.wav> <out.wav>   - Equalize a WAV file
//!   fq-render response                    - Dump the aggregate response as CSV
//!   fq-render plot                        - Dump the response plot path
//!   fq-render defaults                    - Print the factory snapshot
//!   fq-render params                      - List host parameters

mod config;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fq_dsp::PlotBounds;
use fq_state::{EqSnapshot, ParamLayout};

use crate::config::RenderConfig;

#[derive(Parser)]
#[command(name = "fq-render", about = "Frequalizer offline renderer")]
struct Cli {
    /// JSON render configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Equalizer snapshot to apply (overrides the config)
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Equalize a WAV file
    Render {
        input: PathBuf,
        output: PathBuf,
        /// Samples per processing block
        #[arg(short, long)]
        block_size: Option<usize>,
        /// Output bit depth (16, 24 or 32)
        #[arg(long)]
        bit_depth: Option<u16>,
    },
    /// Print the aggregate magnitude response as CSV
    Response {
        #[arg(long)]
        sample_rate: Option<f64>,
    },
    /// Print the response plot path as `x,y` rows
    Plot {
        #[arg(long)]
        sample_rate: Option<f64>,
        #[arg(long, default_value_t = 900)]
        width: i32,
        #[arg(long, default_value_t = 300)]
        height: i32,
        #[arg(long, default_value_t = 40.0)]
        pixels_per_octave: f64,
    },
    /// Print the factory snapshot as JSON
    Defaults,
    /// List host parameters with their ranges and default text
    Params,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if let Some(path) = cli.snapshot {
        config = config.with_snapshot(path);
    }

    match cli.command {
        Commands::Render {
            input,
            output,
            block_size,
            bit_depth,
        } => {
            if let Some(size) = block_size {
                config = config.with_block_size(size);
            }
            if bit_depth.is_some() {
                config.bit_depth = bit_depth;
            }
            let stats = render::render_file(&input, &output, &config)
                .with_context(|| format!("rendering {}", input.display()))?;
            println!(
                "{} frames, {} channels @ {} Hz",
                stats.frames, stats.channels, stats.sample_rate
            );
        }
        Commands::Response { sample_rate } => {
            if let Some(sample_rate) = sample_rate {
                config = config.with_response_sample_rate(sample_rate);
            }
            let snapshot = render::load_snapshot(&config)?;
            let points = render::response(&snapshot, config.response_sample_rate)?;
            print!("{}", render::response_csv(&points));
        }
        Commands::Plot {
            sample_rate,
            width,
            height,
            pixels_per_octave,
        } => {
            if let Some(sample_rate) = sample_rate {
                config = config.with_response_sample_rate(sample_rate);
            }
            let snapshot = render::load_snapshot(&config)?;
            let bounds = PlotBounds::new(0, 0, width, height);
            let path = render::response_plot(
                &snapshot,
                config.response_sample_rate,
                bounds,
                pixels_per_octave,
            )?;
            println!("x,y");
            for (x, y) in path.points() {
                println!("{x},{y}");
            }
        }
        Commands::Defaults => {
            println!("{}", EqSnapshot::default().to_json()?);
        }
        Commands::Params => {
            let layout = ParamLayout::new();
            for spec in layout.specs() {
                let default_text = layout.value_to_text(&spec.id, spec.range.default)?;
                println!(
                    "{:<22} {:<20} [{} .. {}] step {} default {}",
                    spec.id, spec.name, spec.range.min, spec.range.max, spec.range.step, default_text
                );
            }
        }
    }

    Ok(())
}
