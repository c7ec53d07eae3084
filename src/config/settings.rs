use std::time::Duration;

use serde::Deserialize;

use crate::resilience::retry::RetrySettings;
use crate::utils::constants::{DEFAULT_FRESHNESS_WINDOW, DEFAULT_METRICS_PATH, DEFAULT_TOKEN_PATH};

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    /// minimum remaining lifetime of a handed out access token
    pub freshness_seconds: Option<u64>,
    pub retry: Option<RetryConfig>,
    pub metrics: Option<MetricsConfig>,
    pub server: Option<ServerConfig>,
    pub logging: Option<LoggingConfig>,
}

impl SettingsConfig {
    pub fn freshness(&self) -> Duration {
        self.freshness_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FRESHNESS_WINDOW)
    }

    pub fn retry_settings(&self) -> RetrySettings {
        let defaults = RetrySettings::default();
        let Some(retry) = &self.retry else {
            return defaults;
        };
        RetrySettings {
            initial_interval: retry
                .initial_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_interval),
            multiplier: retry.multiplier.unwrap_or(defaults.multiplier),
            max_interval: retry
                .max_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_interval),
            max_elapsed_time: retry
                .max_elapsed_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_elapsed_time),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetryConfig {
    pub initial_interval_ms: Option<u64>,
    /// invariant: >= 1.0
    pub multiplier: Option<f64>,
    /// invariant: >= initial_interval_ms
    pub max_interval_ms: Option<u64>,
    /// total time budget for one token request, retries included
    pub max_elapsed_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default)]
    pub is_enabled: bool,
    /// prometheus subsystem, e.g. `api_outbound`
    pub subsystem: Option<String>,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: "8080".to_string(),
            token_path: default_token_path(),
        }
    }
}

fn default_metrics_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}
