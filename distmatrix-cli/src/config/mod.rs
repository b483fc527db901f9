//! Static client configuration
//!
//! Everything here is read once at startup: the backend base URL, ingest
//! limits, notification settings, timeouts and the progress simulator's tick.
//! Values come from (lowest to highest priority) the built-in defaults, the
//! TOML config file, environment variables and finally CLI flags.

pub mod loader;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use loader::{config_path, load_config, write_default_config};

/// Environment variable overriding the backend base URL
pub const API_BASE_URL_ENV: &str = "DISTMATRIX_API_BASE_URL";

/// Environment variable overriding the departure time zone
pub const TIME_ZONE_ENV: &str = "DISTMATRIX_TIME_ZONE";

/// Complete client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub ingest: IngestLimits,
    pub notifications: NotificationConfig,
    pub progress: ProgressConfig,
    /// IANA zone name used to interpret departure times (falls back to `TZ`, then UTC)
    pub time_zone: Option<String>,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, with or without an `/api` suffix
    pub base_url: String,
    /// Budget for short requests (health, time conversion, download)
    pub request_timeout_secs: u64,
    /// Budget for the synchronous matrix upload
    pub upload_timeout_secs: u64,
}

/// Limits applied to uploaded spreadsheets before parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestLimits {
    /// Accepted extensions including the leading dot, e.g. ".xlsx"
    pub accepted_extensions: Vec<String>,
    pub max_file_size_mb: u64,
}

/// Toast queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub max_toasts: usize,
    pub default_ttl_ms: u64,
}

/// Simulated progress settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub tick_interval_ms: u64,
    /// Highest percentage the simulator will ever show
    pub cap_percent: u8,
    /// Upper bound (exclusive) of the random per-tick increment
    pub max_increment: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
            upload_timeout_secs: 300, // Backend computes the whole matrix before responding
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            accepted_extensions: vec![".xlsx".into(), ".xls".into(), ".csv".into()],
            max_file_size_mb: 16,
        }
    }
}

impl IngestLimits {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Comma-separated list as shown in validation messages
    pub fn accepted_list(&self) -> String {
        self.accepted_extensions.join(",")
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_toasts: 5,
            default_ttl_ms: 5000,
        }
    }
}

impl NotificationConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            cap_percent: 95,
            max_increment: 2.0,
        }
    }
}

impl ProgressConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Config {
    /// Resolve the configured time zone: config value, then `TZ`, then UTC
    pub fn resolve_time_zone(&self) -> anyhow::Result<Tz> {
        let candidate = self
            .time_zone
            .clone()
            .or_else(|| std::env::var("TZ").ok().filter(|tz| !tz.trim().is_empty()));

        match candidate {
            Some(name) => {
                let name = name.trim().trim_start_matches(':');
                name.parse::<Tz>()
                    .map_err(|e| anyhow::anyhow!("Unknown time zone '{}': {}", name, e))
            }
            None => Ok(Tz::UTC),
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                log::debug!("Using API base URL from {}", API_BASE_URL_ENV);
                self.api.base_url = url.trim().to_string();
            }
        }
        if let Ok(tz) = std::env::var(TIME_ZONE_ENV) {
            if !tz.trim().is_empty() {
                self.time_zone = Some(tz.trim().to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.api.upload_timeout(), Duration::from_secs(300));
        assert_eq!(config.ingest.accepted_list(), ".xlsx,.xls,.csv");
        assert_eq!(config.ingest.max_size_bytes(), 16 * 1024 * 1024);
        assert_eq!(config.notifications.max_toasts, 5);
        assert_eq!(config.notifications.default_ttl(), Duration::from_millis(5000));
        assert_eq!(config.progress.cap_percent, 95);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            time_zone = "America/Los_Angeles"

            [api]
            base_url = "https://matrix.example.com/api"

            [notifications]
            max_toasts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://matrix.example.com/api");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.notifications.max_toasts, 3);
        assert_eq!(config.notifications.default_ttl_ms, 5000);
        assert_eq!(
            config.resolve_time_zone().unwrap(),
            chrono_tz::America::Los_Angeles
        );
    }

    #[test]
    fn test_unknown_time_zone_is_rejected() {
        let config = Config {
            time_zone: Some("Mars/Olympus_Mons".to_string()),
            ..Config::default()
        };
        assert!(config.resolve_time_zone().is_err());
    }
}
