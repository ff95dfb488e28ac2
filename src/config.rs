//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and key is optional; an empty file yields the defaults.
//!
//! ```toml
//! [server]
//! base_url = "http://127.0.0.1:8060"
//! timeout_ms = 30000
//!
//! [schedule]
//! tick_secs = 60
//! position_interval_ticks = 1
//! sync_interval_ticks = 10
//!
//! [storage]
//! data_dir = "./data"
//!
//! [positioning]
//! fix_dir = "./fixes"
//!
//! [logging]
//! directory = ""
//! ```

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TrackerError};
use crate::sync::uploader::validate_endpoint;
use crate::tracking::Schedule;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub positioning: PositioningConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Collector connection configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Full upload URL; when unset it is derived from `base_url`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Tick granularity and cadences
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScheduleConfig {
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    #[serde(default = "default_position_interval_ticks")]
    pub position_interval_ticks: u32,

    #[serde(default = "default_sync_interval_ticks")]
    pub sync_interval_ticks: u32,
}

/// Local persistence configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// Position source configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PositioningConfig {
    #[serde(default = "default_fix_dir")]
    pub fix_dir: String,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; empty logs to stderr only
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_base_url() -> String { "http://127.0.0.1:8060".to_string() }
fn default_timeout_ms() -> u64 { 30_000 }

fn default_tick_secs() -> u64 { 60 }
fn default_position_interval_ticks() -> u32 { 1 }
fn default_sync_interval_ticks() -> u32 { 10 }

fn default_data_dir() -> String { "./data".to_string() }
fn default_fix_dir() -> String { "./fixes".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            position_interval_ticks: default_position_interval_ticks(),
            sync_interval_ticks: default_sync_interval_ticks(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            fix_dir: default_fix_dir(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> TrackerError {
    TrackerError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use geo_tracker::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.is_empty() {
            return Err(invalid("base_url cannot be empty"));
        }
        validate_endpoint(&self.server.base_url).map_err(|e| invalid(format!("base_url: {}", e)))?;

        if let Some(endpoint) = &self.server.endpoint {
            validate_endpoint(endpoint).map_err(|e| invalid(format!("endpoint: {}", e)))?;
        }

        if self.server.timeout_ms == 0 || self.server.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms must be between 1 and 300000"));
        }

        if self.schedule.tick_secs == 0 || self.schedule.tick_secs > 3600 {
            return Err(invalid("tick_secs must be between 1 and 3600"));
        }

        if self.schedule.position_interval_ticks == 0 {
            return Err(invalid("position_interval_ticks must be greater than 0"));
        }

        if self.schedule.sync_interval_ticks == 0 {
            return Err(invalid("sync_interval_ticks must be greater than 0"));
        }

        if self.storage.data_dir.is_empty() {
            return Err(invalid("data_dir cannot be empty"));
        }

        if self.positioning.fix_dir.is_empty() {
            return Err(invalid("fix_dir cannot be empty"));
        }

        Ok(())
    }

    /// Scheduler settings
    pub fn schedule(&self) -> Schedule {
        Schedule {
            tick: Duration::from_secs(self.schedule.tick_secs),
            position_interval_ticks: self.schedule.position_interval_ticks,
            sync_interval_ticks: self.schedule.sync_interval_ticks,
        }
    }

    /// Request timeout for uploads
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.server.timeout_ms)
    }

    /// Upload URL for `tracker_id`.
    ///
    /// The explicit `endpoint` wins; otherwise
    /// `<base_url>/v1/locations/<tracker_id>/update`.
    pub fn endpoint(&self, tracker_id: &str) -> String {
        match &self.server.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "{}/v1/locations/{}/update",
                self.server.base_url.trim_end_matches('/'),
                tracker_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_file_equals_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[server]
base_url = "https://tracker.example.com"
timeout_ms = 5000

[schedule]
tick_secs = 30
sync_interval_ticks = 20

[storage]
data_dir = "/var/lib/geo-tracker"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.server.base_url, "https://tracker.example.com");
        assert_eq!(config.timeout(), Duration::from_millis(5000));
        assert_eq!(config.schedule.tick_secs, 30);
        assert_eq!(config.schedule.position_interval_ticks, 1);
        assert_eq!(config.schedule.sync_interval_ticks, 20);
        assert_eq!(config.storage.data_dir, "/var/lib/geo-tracker");
        assert_eq!(config.positioning.fix_dir, "./fixes");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/geo-tracker.toml");
        assert!(matches!(result, Err(TrackerError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::parse("[schedule]\ntick_secs = \"soon\""),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn test_derived_endpoint() {
        let mut config = create_valid_config();
        config.server.base_url = "http://10.0.0.5:8060/".to_string();
        assert_eq!(
            config.endpoint("004217"),
            "http://10.0.0.5:8060/v1/locations/004217/update"
        );
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let mut config = create_valid_config();
        config.server.endpoint = Some("https://collector.example.com/ingest".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint("004217"), "https://collector.example.com/ingest");
    }

    #[test]
    fn test_schedule_conversion() {
        let schedule = create_valid_config().schedule();
        assert_eq!(schedule, Schedule::default());
    }

    #[test]
    fn test_empty_base_url() {
        let mut config = create_valid_config();
        config.server.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_bad_scheme() {
        let mut config = create_valid_config();
        config.server.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_endpoint_override() {
        let mut config = create_valid_config();
        config.server.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_zero() {
        let mut config = create_valid_config();
        config.server.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_too_high() {
        let mut config = create_valid_config();
        config.server.timeout_ms = 300_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_secs_zero() {
        let mut config = create_valid_config();
        config.schedule.tick_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_secs_too_high() {
        let mut config = create_valid_config();
        config.schedule.tick_secs = 3601;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_position_interval_zero() {
        let mut config = create_valid_config();
        config.schedule.position_interval_ticks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sync_interval_zero() {
        let mut config = create_valid_config();
        config.schedule.sync_interval_ticks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_data_dir() {
        let mut config = create_valid_config();
        config.storage.data_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_fix_dir() {
        let mut config = create_valid_config();
        config.positioning.fix_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_base_url(), "http://127.0.0.1:8060");
        assert_eq!(default_timeout_ms(), 30_000);
        assert_eq!(default_tick_secs(), 60);
        assert_eq!(default_position_interval_ticks(), 1);
        assert_eq!(default_sync_interval_ticks(), 10);
        assert_eq!(default_data_dir(), "./data");
        assert_eq!(default_fix_dir(), "./fixes");
        assert_eq!(LoggingConfig::default().directory, "");
    }
}
