//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// IMU Link - byte-stream ingest pipeline for wearable IMU sensor gateways
#[derive(Parser, Debug)]
#[command(
    name = "imu-link",
    author,
    version,
    about = "IMU gateway link pipeline",
    long_about = "Recovers a validated, timestamped multi-sensor sample stream from the\n\
                  gateway's noisy USB serial link: byte-level framing, corruption\n\
                  recovery, backpressure, and link-quality reporting."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "IMU_LINK_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "IMU_LINK_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the link pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "link.toml", env = "IMU_LINK_CONFIG")]
    pub config: PathBuf,

    /// Override the serial port from configuration
    #[arg(long, env = "IMU_LINK_PORT")]
    pub port: Option<String>,

    /// Override: replay this recorded byte stream instead of a live link
    #[arg(long, env = "IMU_LINK_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Override: run against the built-in mock gateway
    #[arg(long, conflicts_with_all = ["port", "replay"])]
    pub mock: bool,

    /// Maximum number of sync frames to deliver (0 = unlimited)
    #[arg(long, default_value = "0", env = "IMU_LINK_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run duration in seconds (0 = until interrupted)
    #[arg(long, default_value = "0", env = "IMU_LINK_DURATION")]
    pub duration: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "IMU_LINK_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "link.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "link.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
