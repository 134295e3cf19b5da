//! pitch_vision - frame replay runner
//!
//! Replays a directory of camera frames through the pitch pipeline at a fixed
//! frame rate and logs every chord the markers play.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pitch_vision::config::{GridMode, PipelineConfig, WindowMode};
use pitch_vision::core_modules::tone_trigger::{SynthToneEngine, TracingSink};
use pitch_vision::{ImageSequenceCapture, Session};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GridArg {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowArg {
    Fixed,
    Tracking,
}

/// Command-line arguments for pitch_vision
#[derive(Parser, Debug)]
#[command(name = "pitch_vision")]
#[command(about = "Turn a tracked marker in a video feed into chords")]
#[command(version)]
struct Cli {
    /// Directory of PNG/JPEG frames, replayed in file-name order
    #[arg(value_name = "FRAMES_DIR")]
    frames: PathBuf,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Replay rate in frames per second
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Override the grid mode from the configuration
    #[arg(long, value_enum)]
    grid: Option<GridArg>,

    /// Override the window mode from the configuration
    #[arg(long, value_enum)]
    window: Option<WindowArg>,

    /// Enable per-frame debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "pitch_vision=debug" } else { "pitch_vision=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(grid) = args.grid {
        config.grid.mode = match grid {
            GridArg::Static => GridMode::Static,
            GridArg::Dynamic => GridMode::Dynamic,
        };
    }
    if let Some(window) = args.window {
        config.window.mode = match window {
            WindowArg::Fixed => WindowMode::Fixed,
            WindowArg::Tracking => WindowMode::Tracking,
        };
    }
    config.validate().context("Invalid configuration")?;

    let engine = Arc::new(SynthToneEngine::spawn(&config.tone, TracingSink));
    let capture = ImageSequenceCapture::new(&args.frames);
    let mut session = Session::start(capture, config, engine.clone())
        .context("Failed to start session")?;
    engine.resume();

    let frame_interval = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);
    info!("Replaying {} at {} fps", args.frames.display(), args.fps);

    let summary = session
        .run(frame_interval, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    session.stop();
    engine.shutdown();

    println!(
        "Processed {} frames ({} failed), played {} chords",
        summary.frames, summary.failed_frames, summary.chords_played
    );
    Ok(())
}
