//! Configuration management for the monitoring server
//!
//! This module provides runtime configuration loading from JSON files so
//! deployments can change the listen address, fallback thresholds and
//! analytics windows without recompilation. Missing or malformed files fall
//! back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::posture::Thresholds;

/// Environment variable naming the JSON config file
pub const CONFIG_PATH_ENV: &str = "POSTURE_MONITOR_CONFIG";
/// Environment variable overriding `server.host:server.port`
pub const ADDR_ENV: &str = "POSTURE_MONITOR_ADDR";

const DEFAULT_CONFIG_PATH: &str = "assets/monitor_config.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Resolve the listen address, honouring `POSTURE_MONITOR_ADDR`
    pub fn socket_addr(&self) -> SocketAddr {
        if let Ok(raw) = std::env::var(ADDR_ENV) {
            match raw.parse() {
                Ok(addr) => return addr,
                Err(err) => log::warn!("[Config] Ignoring {}={}: {}", ADDR_ENV, raw, err),
            }
        }

        format!("{}:{}", self.host, self.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], self.port)))
    }
}

/// Fallback thresholds used when a patient has no active calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Warning tilt in degrees
    pub default_warning: f64,
    /// Danger tilt in degrees
    pub default_danger: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let defaults = Thresholds::DEFAULT;
        Self {
            default_warning: defaults.warning,
            default_danger: defaults.danger,
        }
    }
}

impl ThresholdConfig {
    /// Configured pair, or the built-in pair when the configured one is invalid
    pub fn thresholds(&self) -> Thresholds {
        let configured = Thresholds::new(self.default_warning, self.default_danger);
        match configured.validate() {
            Ok(()) => configured,
            Err(err) => {
                log::warn!("[Config] {}. Using built-in thresholds.", err);
                Thresholds::DEFAULT
            }
        }
    }
}

/// Query windows for history and summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Sessions considered by the summary endpoint
    pub summary_limit: usize,
    /// Default page size for session history
    pub history_limit: usize,
    /// Default page size for recent sensor readings
    pub readings_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            summary_limit: 30,
            history_limit: 50,
            readings_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults if the file doesn't exist or
    /// the JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from `POSTURE_MONITOR_CONFIG` or the bundled asset path
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from_file(path)
    }
}
