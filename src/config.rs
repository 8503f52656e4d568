//! Configuration management for the capture daemon.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether capture is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit the run summary when a scroll run reaches exhaustion
    #[serde(default)]
    pub emit_summary: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            emit_summary: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Wait after each scroll step before snapshotting, in milliseconds
    #[serde(default = "default_scroll_interval")]
    pub scroll_interval_ms: u64,

    /// Settle delay after each capture cycle, in milliseconds
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Wait between an interaction-triggered scroll and its capture cycle
    #[serde(default = "default_interaction_settle")]
    pub interaction_settle_ms: u64,

    /// Minimum time between interaction-triggered recaptures
    #[serde(default = "default_interaction_cooldown")]
    pub interaction_cooldown_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scroll_interval_ms: 200,
            settle_delay_ms: 500,
            interaction_settle_ms: 1200,
            interaction_cooldown_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum visible area for salient-region capture, in px²
    #[serde(default = "default_min_area")]
    pub min_area: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { min_area: 20.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Endpoint receiving extraction batches
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// How often the inactivity flusher polls, in seconds
    #[serde(default = "default_flush_poll")]
    pub flush_poll_seconds: u64,

    /// Seconds without new items before the buffer is flushed
    #[serde(default = "default_flush_after")]
    pub flush_after_seconds: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            flush_poll_seconds: 5,
            flush_after_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Whether markers are drawn for captured elements
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scroll_interval() -> u64 {
    200
}

fn default_settle_delay() -> u64 {
    500
}

fn default_interaction_settle() -> u64 {
    1200
}

fn default_interaction_cooldown() -> u64 {
    1000
}

fn default_min_area() -> f64 {
    20.0
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000/api/extract/".to_string()
}

fn default_flush_poll() -> u64 {
    5
}

fn default_flush_after() -> u64 {
    60
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dom-capture")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.general.enabled);
        assert_eq!(config.timing.scroll_interval_ms, 200);
        assert_eq!(config.timing.interaction_cooldown_ms, 1000);
        assert_eq!(config.filter.min_area, 20.0);
        assert_eq!(config.sink.flush_after_seconds, 60);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"
emit_summary = true

[timing]
scroll_interval_ms = 50

[sink]
endpoint = "http://localhost:9999/extract"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(config.general.emit_summary);
        assert_eq!(config.timing.scroll_interval_ms, 50);
        assert_eq!(config.sink.endpoint, "http://localhost:9999/extract");
        // Unspecified sections keep defaults
        assert_eq!(config.timing.settle_delay_ms, 500);
        assert!(config.overlay.enabled);
    }

    #[test]
    fn test_load_from_missing_path_uses_defaults() {
        let config = Config::load_from_path(PathBuf::from("/nonexistent/config.toml"));
        assert!(config.general.enabled);
    }

    #[test]
    fn test_load_from_malformed_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        let config = Config::load_from_path(file.path().to_path_buf());
        assert_eq!(config.timing.scroll_interval_ms, 200);
    }
}
