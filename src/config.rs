//! Configuration file handling with TOML support.

use crate::api::DEFAULT_BASE_URL;
use crate::cli::Args;
use crate::controller::{ControllerSettings, DEFAULT_DEBOUNCE, DEFAULT_MIN_QUERY_CHARS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Prediction service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Input handling settings
    #[serde(default)]
    pub input: InputConfig,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Where and how to reach the prediction service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Base URL of the service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout() -> u64 {
    10
}

/// Typing and form behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// Quiet period before suggestions are fetched, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum query length (after trimming) that triggers a fetch
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,

    /// Pre-filled prediction horizon in days
    #[serde(default)]
    pub default_days: Option<u32>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_chars: default_min_query_chars(),
            default_days: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}
fn default_min_query_chars() -> usize {
    DEFAULT_MIN_QUERY_CHARS
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Number of past predictions kept in the history pane
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Suggestion rows visible at once
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

fn default_history_size() -> usize {
    10
}
fn default_max_suggestions() -> usize {
    8
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from default location or create default.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!("Failed to load config: {:#}", e);
                        eprintln!("Warning: Failed to load config: {}", e);
                    }
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stonkcast").join("config.toml"))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Apply command-line overrides on top of the file values.
    pub fn merge_args(&mut self, args: &Args) {
        if let Some(ref url) = args.base_url {
            self.service.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.service.timeout = timeout;
        }
        if let Some(debounce_ms) = args.debounce_ms {
            self.input.debounce_ms = debounce_ms;
        }
        if let Some(min_chars) = args.min_chars {
            self.input.min_query_chars = min_chars;
        }
        if args.days.is_some() {
            self.input.default_days = args.days;
        }
    }

    /// Controller tunables derived from this configuration.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            debounce: Duration::from_millis(self.input.debounce_ms),
            min_query_chars: self.input.min_query_chars,
            history_size: self.display.history_size,
        }
    }
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# Stonkcast Configuration File

[service]
# Base URL of the suggestion/prediction service
base_url = "http://127.0.0.1:5000"
# Request timeout in seconds
timeout = 10

[input]
# Quiet period after the last keystroke before suggestions are fetched
debounce_ms = 300
# Shortest query (after trimming) that triggers a fetch
min_query_chars = 2
# Pre-filled prediction horizon in days (optional)
default_days = 30

[display]
# Past predictions kept in the history pane
history_size = 10
# Suggestion rows visible at once
max_suggestions = 8
"##
}
