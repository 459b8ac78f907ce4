//! Layered runtime configuration
//!
//! Layers, later wins:
//! 1. Built-in defaults
//! 2. TOML file from `--config`, else `config/eyedtrack.toml` if present
//! 3. `EYEDTRACK__<SECTION>__<KEY>` environment variables

use alerting::SoundSettings;
use backend_client::{ClientConfig, DEFAULT_BASE_URLS};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file looked up when none is given
pub const DEFAULT_CONFIG_PATH: &str = "config/eyedtrack.toml";

const ENV_PREFIX: &str = "EYEDTRACK";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Backend endpoints and timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Candidate base URLs, tried in order
    pub base_urls: Vec<String>,
    /// Timeout for one latest-behavior poll (ms)
    pub behavior_timeout_ms: u64,
    /// Timeout for one alert history request (ms)
    pub history_timeout_ms: u64,
    /// Timeout for health checks and frame uploads (ms)
    pub request_timeout_ms: u64,
    /// Health checks tried before monitoring is refused
    pub health_attempts: u32,
    /// Pause between those health checks (ms)
    pub health_retry_ms: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_urls: DEFAULT_BASE_URLS.iter().map(|s| s.to_string()).collect(),
            behavior_timeout_ms: 3000,
            history_timeout_ms: 5000,
            request_timeout_ms: 10_000,
            health_attempts: 3,
            health_retry_ms: 2000,
        }
    }
}

/// Polling and upload cadence
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    /// Latest-behavior poll period (ms)
    pub interval_ms: u64,
    /// Minimum gap between uploaded camera frames (ms)
    pub frame_interval_ms: u64,
    /// Period of the uploader's health check (ms)
    pub health_interval_ms: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            frame_interval_ms: 200,
            health_interval_ms: 10_000,
        }
    }
}

impl PollingSection {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }
}

/// External programs used to voice alerts
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpeechSection {
    /// Text-to-speech program; the message is appended as last argument
    pub command: Option<String>,
    /// Arguments before the message, `{volume}` is replaced by the percent
    pub args: Vec<String>,
    /// Program run for each vibration pulse
    pub vibrate_command: Option<String>,
}

/// Alert history lookup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Records shown when no `--limit` is given
    pub limit: usize,
    /// Log file candidates, empty for the usual locations
    pub log_paths: Vec<PathBuf>,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            limit: 50,
            log_paths: Vec::new(),
        }
    }
}

/// Log output
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub backend: BackendSection,
    pub polling: PollingSection,
    /// Volume and vibration preferences applied to every alert
    pub sound: SoundSettings,
    pub speech: SpeechSection,
    pub history: HistorySection,
    pub logging: LoggingSection,
}

impl MonitorConfig {
    /// Load all layers; an explicit path must exist
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("backend.base_urls")
            .with_list_parse_key("history.log_paths");

        let builder = match path {
            Some(path) => Config::builder().add_source(File::from(path).required(true)),
            None => Config::builder().add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false)),
        };

        let config: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a single TOML file, ignoring the environment
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_urls.is_empty() {
            return Err(ConfigError::Invalid {
                field: "backend.base_urls",
                reason: "at least one base URL is required".to_string(),
            });
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "polling.interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.backend.health_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "backend.health_attempts",
                reason: "must be positive".to_string(),
            });
        }
        if self.polling.health_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "polling.health_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            base_urls: self.backend.base_urls.clone(),
            behavior_timeout: Duration::from_millis(self.backend.behavior_timeout_ms),
            history_timeout: Duration::from_millis(self.backend.history_timeout_ms),
            request_timeout: Duration::from_millis(self.backend.request_timeout_ms),
            ..ClientConfig::default()
        }
    }
}
