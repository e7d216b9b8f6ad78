//! CLI arguments and subcommands for argus-host-reporter.
//!
//! This module defines the command-line interface structure using the clap
//! library, including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug, Default)]
#[command(
    name = "argus-host-reporter",
    about = "Periodic host telemetry reporter: CPU temperature, utilization, throttling and storage usage",
    long_about = "Periodic host telemetry reporter for Linux.\n\n\
                  Samples CPU temperature, per-core utilization, the thermal cooling device\n\
                  state and filesystem usage on a fixed interval, writes JSON Lines records\n\
                  to stdout and optionally posts formatted summaries to a chat webhook.",
    author = "Jonas Weidner <argus@weidner.dev>",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Collection interval in seconds
    #[arg(short = 'i', long)]
    pub interval_secs: Option<u64>,

    /// sysfs path for the CPU temperature reading
    #[arg(long)]
    pub temp_path: Option<PathBuf>,

    /// sysfs path for the cooling device state
    #[arg(long)]
    pub cooling_path: Option<PathBuf>,

    /// Comma-separated filesystem paths to measure (e.g. /,/boot)
    #[arg(long)]
    pub storage_paths: Option<String>,

    /// Webhook URL for chat notifications (empty disables)
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Seconds between webhook posts (0 disables the webhook)
    #[arg(long)]
    pub webhook_every_secs: Option<u64>,

    /// Minimum seconds between outbound webhook posts (0 disables the gate)
    #[arg(long)]
    pub webhook_min_interval_secs: Option<u64>,

    /// Keep writing JSON records to stdout while the webhook is active
    #[arg(long)]
    pub also_console: bool,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Ignore config files and use defaults plus CLI flags only
    #[arg(long)]
    pub no_config: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the effective configuration and exit
    Config {
        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Run every collector once, print the JSON record and exit
    Once,
}
