//! Core: configuration plus the ordered logic registry.

use crate::config::AppConfig;
use crate::logic::LogicBlock;
use serde::de::DeserializeOwned;

/// Shared state built during bootstrap and frozen behind an `Arc` before the
/// server starts.
#[derive(Debug)]
pub struct Core {
    settings: config::Config,
    config: AppConfig,
    logic: Vec<LogicBlock>,
}

impl Core {
    pub fn new(settings: config::Config) -> Result<Self, config::ConfigError> {
        let config = AppConfig::from_settings(&settings)?;
        Ok(Self {
            settings,
            config,
            logic: Vec::new(),
        })
    }

    /// Core with built-in defaults only
    pub fn with_defaults() -> Self {
        crate::config::defaults()
            .and_then(Self::new)
            .unwrap_or_else(|e| {
                crate::logger::log_warning(&format!("[Aeri] Falling back to empty settings: {e}"));
                Self {
                    settings: config::Config::default(),
                    config: AppConfig::default(),
                    logic: Vec::new(),
                }
            })
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn settings(&self) -> &config::Config {
        &self.settings
    }

    /// Read any dotted key from the layered settings, falling back to
    /// `default` when it is missing or has the wrong type
    pub fn get_config<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.settings.get::<T>(key).unwrap_or(default)
    }

    pub fn logic(&self) -> &[LogicBlock] {
        &self.logic
    }

    pub fn add_logic(&mut self, block: LogicBlock) {
        self.logic.push(block);
    }

    pub fn has_http_routes(&self) -> bool {
        self.logic.iter().any(LogicBlock::has_http_routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::HttpRouteConfig;

    #[test]
    fn test_get_config_nested_and_default() {
        let settings = crate::config::builder()
            .unwrap()
            .set_override("payments.currency", "EUR")
            .unwrap()
            .build()
            .unwrap();
        let core = Core::new(settings).unwrap();

        assert_eq!(core.get_config("http.port", 0_u16), 3000);
        assert_eq!(core.get_config("payments.currency", String::new()), "EUR");
        assert_eq!(core.get_config("payments.missing", 42_i64), 42);
    }

    #[test]
    fn test_has_http_routes() {
        let mut core = Core::with_defaults();
        core.add_logic(LogicBlock::new());
        assert!(!core.has_http_routes());
        core.add_logic(LogicBlock::new().route("ping", HttpRouteConfig::new()));
        assert!(core.has_http_routes());
        assert_eq!(core.logic().len(), 2);
    }
}
