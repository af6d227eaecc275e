// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

pub const PRODUCTION: &str = "production";

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Deployment environment; `"production"` redacts error details
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION)
    }
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Request bodies above this size are answered with 413
    #[serde(default = "default_max_body_size")]
    pub max_body_size: u64,
    /// Delay between a port-in-use failure and the attempt on the next port
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Cap on occupied ports to skip; unset retries forever
    #[serde(default)]
    pub max_port_retries: Option<u32>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_access_log")]
    pub access_log: bool,
    /// Access log format (combined or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Info/access log file path (optional, stdout if not set)
    #[serde(default)]
    pub log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

fn default_environment() -> String {
    "development".to_string()
}

const fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_enabled() -> bool {
    true
}

const fn default_max_body_size() -> u64 {
    1_048_576
}

const fn default_retry_delay_ms() -> u64 {
    100
}

fn default_level() -> String {
    "info".to_string()
}

const fn default_access_log() -> bool {
    true
}

fn default_access_log_format() -> String {
    "combined".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            enabled: default_enabled(),
            max_body_size: default_max_body_size(),
            retry_delay_ms: default_retry_delay_ms(),
            max_port_retries: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            access_log: default_access_log(),
            access_log_format: default_access_log_format(),
            log_file: None,
            error_log_file: None,
        }
    }
}
