//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: Where the dashboard listens.
//!     - PollingConfig: How often the selected station is polled.
//!     - ClockConfig: Clock tick period.
//!     - DisplayConfig: Page title and browser refresh period.
//!     - InsightConfig: Completion model, endpoint and api key env var.
//!     - LoggingConfig: Log filter and sensor-data echo.
//!     - locations: Optional station list (built-in stations otherwise).
//!
//! ==============================================================================

use crate::domain::Location;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// where the running configuration came from
#[derive(Debug)]
pub enum ConfigOrigin {
    File(PathBuf),
    /// no usable file; `failures` lists files that exist but did not load
    Defaults { failures: Vec<String> },
}

impl ConfigOrigin {
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => tracing::info!(path = %path.display(), "config loaded"),
            ConfigOrigin::Defaults { failures } => {
                for failure in failures {
                    tracing::warn!("failed to load config {}", failure);
                }
                tracing::warn!("no usable config file found - using defaults");
            }
        }
    }
}

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub clock: ClockConfig,
    pub display: DisplayConfig,
    pub insight: InsightConfig,
    pub logging: LoggingConfig,
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClockConfig {
    pub tick_millis: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
    pub refresh_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InsightConfig {
    pub model: String,
    pub base_url: String,
    /// name of the env var holding the secret, never the secret itself
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 60, timeout_seconds: 10 }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { tick_millis: 1000 }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { title: "芳和實驗中學環境現況".to_string(), refresh_seconds: 1 }
    }
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "API_KEY".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}

impl InsightConfig {
    /// the key from the configured env var; an empty value counts as unset
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

impl ClockConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {}", path.as_ref().display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("failed to parse config")
    }

    /// Load with default fallback
    ///
    /// runs before logging is set up, so the outcome is returned for the
    /// caller to log once the subscriber exists.
    pub fn load_or_default() -> (Self, ConfigOrigin) {
        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        let mut failures = Vec::new();
        for path in paths {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return (config, ConfigOrigin::File(path)),
                    Err(e) => failures.push(format!("{}: {:#}", path.display(), e)),
                }
            }
        }

        (Self::default(), ConfigOrigin::Defaults { failures })
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        let key_present = self.insight.api_key().is_some();
        tracing::info!(
            bind = %self.server.bind,
            poll_interval_s = self.polling.interval_seconds,
            clock_tick_ms = self.clock.tick_millis,
            model = %self.insight.model,
            api_key_env = %self.insight.api_key_env,
            api_key_present = key_present,
            configured_locations = self.locations.len(),
            "host configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = HostConfig::parse("").unwrap();
        assert_eq!(config.polling.interval_seconds, 60);
        assert_eq!(config.clock.tick_millis, 1000);
        assert_eq!(config.insight.model, "gemini-3-flash-preview");
        assert_eq!(config.insight.api_key_env, "API_KEY");
        assert!(config.locations.is_empty());
    }

    #[test]
    fn partial_sections_and_locations() {
        let config = HostConfig::parse(
            r#"
            [polling]
            interval_seconds = 30

            [logging]
            level = "debug"

            [[locations]]
            id = "X"
            name = "操場"
            api_url = "http://localhost:9000/x"
            "#,
        )
        .unwrap();

        assert_eq!(config.polling.interval_seconds, 30);
        assert_eq!(config.polling.timeout_seconds, 10);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.show_sensor_data);
        assert_eq!(config.locations.len(), 1);
        assert_eq!(config.locations[0].name, "操場");
    }

    #[test]
    fn zero_durations_are_clamped() {
        let config = HostConfig::parse("[polling]\ninterval_seconds = 0\n[clock]\ntick_millis = 0").unwrap();
        assert_eq!(config.polling.interval(), Duration::from_secs(1));
        assert_eq!(config.clock.tick(), Duration::from_millis(1));
    }

    #[test]
    fn empty_api_key_counts_as_unset() {
        let insight = InsightConfig {
            api_key_env: "CAMPUS_ENV_TEST_EMPTY_KEY".to_string(),
            ..InsightConfig::default()
        };

        std::env::set_var(&insight.api_key_env, "");
        assert_eq!(insight.api_key(), None);

        std::env::set_var(&insight.api_key_env, "k-123");
        assert_eq!(insight.api_key().as_deref(), Some("k-123"));

        std::env::remove_var(&insight.api_key_env);
        assert_eq!(insight.api_key(), None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(HostConfig::parse("[polling]\ninterval_seconds = \"soon\"").is_err());
    }
}
