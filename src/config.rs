use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the EFA deployment. Defaults to the VVM mobile app
    /// backend when absent.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Interval in seconds between poll cycles (default: 60)
    #[serde(default = "Config::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Stops to monitor
    pub stops: Vec<StopConfig>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn default_poll_interval_secs() -> u64 {
        60
    }
}

/// Configuration for one monitored stop
#[derive(Debug, Clone, Deserialize)]
pub struct StopConfig {
    /// Stateless EFA stop id, e.g. "3700105"
    pub stop_id: String,
    /// Display name. Resolved from the provider at startup when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Only departures leaving within this many minutes are kept (default: 15)
    #[serde(default = "StopConfig::default_time_window_minutes")]
    pub time_window_minutes: u32,
    /// Vehicle category labels to keep, all when empty
    #[serde(default)]
    pub vehicle_types: Vec<String>,
    /// Comma-separated line numbers, "*" keeps all (default: "*")
    #[serde(default = "StopConfig::default_line_numbers")]
    pub line_numbers: String,
    /// Comma-separated destination substrings, "" keeps all (default: "")
    #[serde(default = "StopConfig::default_directions")]
    pub directions: String,
}

impl StopConfig {
    fn default_time_window_minutes() -> u32 {
        15
    }
    fn default_line_numbers() -> String {
        "*".to_string()
    }
    fn default_directions() -> String {
        String::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
