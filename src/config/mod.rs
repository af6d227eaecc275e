// Configuration module entry point
// Layers an optional config file and AERI__* environment variables over defaults

mod types;

pub use types::{AppConfig, HttpConfig, LoggingConfig, PRODUCTION};

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};

/// Config file looked up (without extension) when none is given
pub const DEFAULT_CONFIG_FILE: &str = "aeri";

/// Builder pre-populated with every default, ready for extra sources or overrides
pub fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("environment", "development")?
        .set_default("http.port", 3000)?
        .set_default("http.host", "127.0.0.1")?
        .set_default("http.enabled", true)?
        .set_default("http.max_body_size", 1_048_576)?
        .set_default("http.retry_delay_ms", 100)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")
}

/// Load settings from `config_path` (extension optional, file may be absent)
/// and `AERI__SECTION__KEY` environment variables
pub fn load_from(config_path: &str) -> Result<config::Config, ConfigError> {
    builder()?
        .add_source(File::with_name(config_path).required(false))
        .add_source(
            Environment::with_prefix("AERI")
                .separator("__")
                .try_parsing(true),
        )
        .build()
}

/// Settings with nothing but the defaults
pub fn defaults() -> Result<config::Config, ConfigError> {
    builder()?.build()
}

impl AppConfig {
    pub fn from_settings(settings: &config::Config) -> Result<Self, ConfigError> {
        settings.clone().try_deserialize()
    }
}
