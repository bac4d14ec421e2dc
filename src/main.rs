use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use framegrab::core::extractor::{self, ExtractOptions, OutputFormat};
use framegrab::decoder::ScaleMode;
use framegrab::{logging, ui};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract frames from a video
    Extract {
        /// Video source: a file path or a URL the backend understands
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Output frame rate; 0 keeps the native rate
        #[arg(short, long, default_value_t = 0)]
        fps: u32,
        /// Output width in pixels (requires --height)
        #[arg(long)]
        width: Option<u32>,
        /// Output height in pixels (requires --width)
        #[arg(long)]
        height: Option<u32>,
        #[arg(short, long, value_enum, default_value_t = ScaleMode::Fit)]
        scale: ScaleMode,
        #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
        format: OutputFormat,
        /// JPEG quality (1-100)
        #[arg(long, default_value_t = 90)]
        quality: u8,
        /// Stop after this many frames
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Probe a video and print its properties as JSON
    Probe {
        #[arg(short, long)]
        input: String,
    },
    /// Interactive mode (menu)
    Interactive {
        /// Directory to scan for video files
        #[arg(short, long, default_value = "assets/video")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let stop = Arc::new(AtomicBool::new(false));
    let r = stop.clone();
    ctrlc::set_handler(move || {
        r.store(true, Ordering::SeqCst);
    })
    .context("Error registering Ctrl-C handler")?;

    match &cli.command {
        Commands::Extract {
            input,
            output_dir,
            fps,
            width,
            height,
            scale,
            format,
            quality,
            limit,
        } => {
            let size = match (width, height) {
                (Some(w), Some(h)) => Some((*w, *h)),
                (None, None) => None,
                _ => anyhow::bail!("--width and --height must be given together"),
            };
            let opts = ExtractOptions {
                frame_rate: *fps,
                limit: *limit,
                size,
                scale_mode: *scale,
                format: *format,
                jpeg_quality: *quality,
            };
            let summary = extractor::extract_frames(input, output_dir, &opts, stop)
                .with_context(|| format!("Extraction failed for {}", input))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Probe { input } => {
            let meta = extractor::probe(input)
                .with_context(|| format!("Probe failed for {}", input))?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        Commands::Interactive { dir } => {
            ui::interactive::run_interactive(dir, stop)?;
        }
    }

    Ok(())
}
