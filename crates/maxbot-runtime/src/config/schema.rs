//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaxBotConfig {
    /// Bot access token issued by the platform.
    #[serde(default)]
    pub token: String,

    /// Platform API client settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Long-poll delivery settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Webhook server settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// API
// =============================================================================

/// Platform API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Returns the timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    maxbot_transport::DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Polling
// =============================================================================

/// Long-poll delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Update types requested from the platform; empty means all.
    #[serde(default)]
    pub types: Vec<String>,

    /// Pause after each processed batch, in milliseconds.
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Pause after a failed iteration, in milliseconds.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,

    /// Updates older than this many seconds are skipped.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            idle_delay_ms: default_idle_delay_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            staleness_secs: default_staleness_secs(),
        }
    }
}

impl PollingConfig {
    /// Returns the idle delay.
    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    /// Returns the error backoff.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Returns the staleness window.
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

fn default_idle_delay_ms() -> u64 {
    1000
}

fn default_error_backoff_ms() -> u64 {
    5000
}

fn default_staleness_secs() -> u64 {
    120
}

// =============================================================================
// Webhook
// =============================================================================

/// Webhook server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route that receives updates.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

impl WebhookConfig {
    /// Returns `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/".to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debugging detail.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Returns the lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated.
    #[default]
    Compact,
    /// Single-line with all fields.
    Full,
    /// Multi-line, human oriented.
    Pretty,
    /// One JSON object per line (`json-log` feature).
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// The file named by `file_path`.
    File,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level.
    #[serde(default)]
    pub level: LogLevel,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination.
    #[serde(default)]
    pub output: LogOutput,

    /// File used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module levels, e.g. `maxbot_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    /// Dump every processed update and its reply at `info`.
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            filters: HashMap::new(),
            verbose: default_verbose(),
        }
    }
}

fn default_verbose() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MaxBotConfig::default();
        assert!(config.token.is_empty());
        assert_eq!(config.api.base_url, "https://platform-api.max.ru");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.polling.idle_delay(), Duration::from_secs(1));
        assert_eq!(config.polling.error_backoff(), Duration::from_secs(5));
        assert_eq!(config.polling.staleness(), Duration::from_secs(120));
        assert_eq!(config.webhook.bind_addr(), "0.0.0.0:8080");
        assert!(config.logging.verbose);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: MaxBotConfig = serde_json::from_value(serde_json::json!({
            "token": "abc",
            "polling": { "types": ["message_created"] },
            "logging": { "level": "debug", "filters": { "maxbot_transport": "trace" } }
        }))
        .unwrap();

        assert_eq!(config.polling.types, vec!["message_created"]);
        assert_eq!(config.polling.idle_delay_ms, 1000);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.filters["maxbot_transport"], LogLevel::Trace);
        assert_eq!(config.webhook.port, 8080);
    }
}
