//! Error types shared across the crate.

use std::any::Any;
use std::path::PathBuf;
use thiserror::Error;

/// Failure raised by a handler or a middleware while serving a request.
///
/// Everything that reaches the error boundary is one of these, including
/// panics unwound out of a handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert a panic payload into an error.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::new(format!("handler panicked: {detail}"))
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A single route entry that could not be turned into a server route.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Handler for \"{0}\" not found or not a function.")]
    MissingHandler(String),
    #[error("Unsupported HTTP method: {method} (route \"{function}\")")]
    UnsupportedMethod { function: String, method: String },
}

/// Failure to bring the listener up.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("port {0} is in use and there is no higher port to try")]
    PortExhausted(u16),
    #[error("gave up after {attempts} occupied port(s) starting at {first}")]
    RetryLimit { first: u16, attempts: u32 },
    #[error("invalid listen address {0}")]
    InvalidAddress(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure to load one logic source. Never fatal to the process.
#[derive(Debug, Error)]
pub enum LogicLoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("{}: {message}", path.display())]
    Shape { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("server failed to start: {0}")]
    Bind(#[from] BindError),
    #[error("module failed: {0}")]
    Module(String),
}
