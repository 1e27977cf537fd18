// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Motion-monitoring camera recorder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture from a camera or video file
    Run {
        /// Camera device index
        #[arg(short, long, conflicts_with = "file")]
        device: Option<i32>,

        /// Video file to play instead of a live camera
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// JSON capture configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Mirror frames horizontally
        #[arg(long)]
        mirror: bool,

        /// Enable motion monitoring (records automatically on motion)
        #[arg(long)]
        monitor: bool,

        /// Measure throughput over the first sampling window
        #[arg(long)]
        measure_fps: bool,

        /// Start recording immediately
        #[arg(long)]
        record: bool,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Directory for recordings (default: ~/Videos/vigil)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Print the recordings directory
    Storage,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=vigil=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let args = Cli::parse();

    match args.command {
        Commands::Run {
            device,
            file,
            config,
            mirror,
            monitor,
            measure_fps,
            record,
            duration,
            output_dir,
        } => {
            let config = cli::build_config(device, file, config)?;
            cli::run_session(cli::RunOptions {
                config,
                mirror,
                monitor,
                measure_fps,
                record,
                duration,
                output_dir,
            })
        }
        Commands::Storage => cli::show_storage_dir(),
    }
}
