//! EyeDTrack - Main Entry Point

use clap::{Parser, Subcommand};
use monitor::{init_logging, run_history, run_monitor, run_replay, MonitorConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "eyedtrack", version, about = "Driver monitoring client")]
struct Cli {
    /// TOML config file (default: config/eyedtrack.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poll the backend and voice alerts until Ctrl-C
    Monitor,
    /// Print recent alerts from the best available source
    History {
        /// Maximum number of alerts
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload recorded JPEG frames as if they came from the camera
    Replay {
        /// Directory of .jpg / .jpeg frames
        #[arg(short, long)]
        dir: PathBuf,
        /// Frames per second
        #[arg(long, default_value_t = 5.0)]
        fps: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = MonitorConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== EyeDTrack v{} ===", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Monitor => run_monitor(&config).await,
        Command::History { limit, json } => run_history(&config, limit, json).await,
        Command::Replay { dir, fps } => run_replay(&config, &dir, fps).await,
    }
}
