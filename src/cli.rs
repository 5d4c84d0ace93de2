//! Command-line interface for voxwarden
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Keyword moderation pipeline for multi-party voice sessions
#[derive(Parser, Debug)]
#[command(name = "voxwarden", version, about = "Keyword moderation for voice sessions")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: stage progress, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a WAV fixture through the full pipeline for threshold tuning
    Simulate {
        /// WAV file standing in for one speaker's utterance
        #[arg(value_name = "WAV")]
        wav: PathBuf,

        /// Prohibited terms (overrides the configured set when non-empty)
        #[arg(long, value_name = "TERM")]
        term: Vec<String>,

        /// Transcript the mock recognizer returns (ignored with --features whisper
        /// and an installed model)
        #[arg(long, value_name = "TEXT", default_value = "mock transcription")]
        transcript: String,

        /// Task timeout, e.g. "20s" or "1m"
        #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
        task_timeout: Option<Duration>,

        /// Skip the ffmpeg enhancement subprocess
        #[arg(long)]
        no_enhance: bool,
    },

    /// Configuration inspection
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file path
    Path,
}
