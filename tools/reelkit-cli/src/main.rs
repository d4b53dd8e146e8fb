//! ReelKit CLI — Command-line interface for inspecting, previewing, and exporting projects.
//!
//! Usage:
//!   reelkit inspect <PAYLOAD>          Summarise a backend project payload
//!   reelkit frame <PAYLOAD> <FRAME>    Print the composition of one frame
//!   reelkit captions <SRT>             Parse and list (or normalise) captions
//!   reelkit preview <PAYLOAD>          Play a payload in real time
//!   reelkit fetch <MEDIA_ID>           Fetch a project from the backend
//!   reelkit export <MEDIA_ID>          Save and render a new version

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reelkit",
    about = "Frame-accurate slideshow video preview and render orchestration",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a backend project payload
    Inspect {
        /// Path to the project JSON
        payload: PathBuf,
    },

    /// Print the layers composed for one frame as JSON
    Frame {
        /// Path to the project JSON
        payload: PathBuf,

        /// Global frame number
        frame: u64,

        /// SRT file to overlay
        #[arg(long)]
        captions: Option<PathBuf>,
    },

    /// Parse an SRT file and list its cues
    Captions {
        /// Path to the SRT file
        path: PathBuf,

        /// Re-emit the cues as normalised SRT instead of listing them
        #[arg(long)]
        normalize: bool,
    },

    /// Play a project in real time, logging scene changes
    Preview {
        /// Path to the project JSON
        payload: PathBuf,

        /// Playback rate: 0.5, 1, 1.5 or 2
        #[arg(long, default_value = "1.0")]
        rate: f64,

        /// Loop at the end instead of stopping
        #[arg(long = "loop")]
        looping: bool,

        /// Stop after this many seconds of wall time
        #[arg(long, default_value = "10.0")]
        seconds: f64,
    },

    /// Fetch a project from the backend and summarise it
    Fetch {
        /// Media id
        media_id: String,
    },

    /// Save a project and render it as a new version
    Export {
        /// Media id
        media_id: String,

        /// Wait until the new version finishes rendering
        #[arg(long)]
        wait: bool,

        /// Seconds between status polls (defaults to the configured interval)
        #[arg(long)]
        poll_secs: Option<u64>,

        /// Give up waiting after this many polls
        #[arg(long, default_value = "120")]
        max_polls: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = reelkit_common::config::AppConfig::load();

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    reelkit_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Inspect { payload } => commands::inspect::run(payload),
        Commands::Frame {
            payload,
            frame,
            captions,
        } => commands::frame::run(payload, frame, captions),
        Commands::Captions { path, normalize } => commands::captions::run(path, normalize),
        Commands::Preview {
            payload,
            rate,
            looping,
            seconds,
        } => commands::preview::run(payload, rate, looping, seconds).await,
        Commands::Fetch { media_id } => commands::fetch::run(&config, media_id).await,
        Commands::Export {
            media_id,
            wait,
            poll_secs,
            max_polls,
        } => commands::export::run(&config, media_id, wait, poll_secs, max_polls).await,
    }
}
