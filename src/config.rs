//! Configuration management for argus-host-reporter.
//!
//! This module handles loading, merging, and validating configuration from
//! files and CLI arguments. It supports YAML, JSON, and TOML formats with
//! precedence CLI > config file > defaults.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_TEMP_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
pub const DEFAULT_COOLING_PATH: &str = "/sys/class/thermal/cooling_device0/cur_state";
pub const DEFAULT_CPU_STAT_PATH: &str = "/proc/stat";
pub const DEFAULT_MOUNTINFO_PATH: &str = "/proc/self/mountinfo";
pub const DEFAULT_STORAGE_PATHS: &str = "/";

/// Reporter configuration. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    // Collection
    pub interval_secs: Option<u64>,
    pub temp_path: Option<PathBuf>,
    pub cooling_path: Option<PathBuf>,
    pub storage_paths: Option<Vec<String>>,

    // Webhook notifier
    pub webhook_url: Option<String>,
    pub webhook_every_secs: Option<u64>,
    pub webhook_min_interval_secs: Option<u64>,
    pub also_console: Option<bool>,

    // Logging
    pub log_level: Option<String>,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn temp_path(&self) -> PathBuf {
        self.temp_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_PATH))
    }

    pub fn cooling_path(&self) -> PathBuf {
        self.cooling_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COOLING_PATH))
    }

    pub fn storage_paths(&self) -> Vec<String> {
        self.storage_paths
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_STORAGE_PATHS.to_string()])
    }

    pub fn webhook_url(&self) -> String {
        self.webhook_url.clone().unwrap_or_default()
    }

    pub fn webhook_every(&self) -> Duration {
        Duration::from_secs(self.webhook_every_secs.unwrap_or(0))
    }

    pub fn webhook_min_interval(&self) -> Duration {
        Duration::from_secs(self.webhook_min_interval_secs.unwrap_or(0))
    }

    /// The webhook loop runs only with a URL and a non-zero interval.
    pub fn webhook_enabled(&self) -> bool {
        !self.webhook_url().is_empty() && !self.webhook_every().is_zero()
    }

    /// Console output stays on when the webhook is off, or when explicitly
    /// requested alongside it.
    pub fn console_enabled(&self) -> bool {
        !self.webhook_enabled() || self.also_console.unwrap_or(false)
    }
}

/// Split a comma-separated path list, dropping blank entries.
fn split_paths(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate effective config (used by the `config` subcommand and at startup).
/// A failure here is the only fatal condition: nothing has started yet.
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if cfg.interval().is_zero() {
        bail!("collection interval must be at least 1 second");
    }

    let url = cfg.webhook_url();
    if !url.is_empty() && !url.starts_with("https://") && !url.starts_with("http://") {
        bail!("webhook_url must be an http(s) URL, got: {}", url);
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if args.interval_secs.is_some() {
        config.interval_secs = args.interval_secs;
    }
    if let Some(path) = &args.temp_path {
        config.temp_path = Some(path.clone());
    }
    if let Some(path) = &args.cooling_path {
        config.cooling_path = Some(path.clone());
    }
    if let Some(paths) = &args.storage_paths {
        config.storage_paths = Some(split_paths(paths));
    }
    if let Some(url) = &args.webhook_url {
        config.webhook_url = Some(url.clone());
    }
    if args.webhook_every_secs.is_some() {
        config.webhook_every_secs = args.webhook_every_secs;
    }
    if args.webhook_min_interval_secs.is_some() {
        config.webhook_min_interval_secs = args.webhook_min_interval_secs;
    }
    if args.also_console {
        config.also_console = Some(true);
    }

    Ok(config)
}

/// Configuration loading with multiple format support.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = path {
        p.to_path_buf()
    } else {
        // Try default locations
        let defaults = [
            "/etc/argus/host-reporter.yaml",
            "/etc/argus/host-reporter.yml",
            "/etc/argus/host-reporter.json",
            "./argus-host-reporter.yaml",
            "./argus-host-reporter.yml",
            "./argus-host-reporter.json",
        ];

        match defaults.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        }
    };

    if !path.exists() {
        bail!("config file not found: {}", path.display());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<()> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}
