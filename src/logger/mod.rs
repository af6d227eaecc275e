//! Logger module
//!
//! Tagged console/file logging for the bootstrap, the route builder and the
//! HTTP server, plus the per-request access log.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::LoggingConfig;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    /// Unknown names map to `Info`
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Debug,
            2 => Self::Warn,
            3 => Self::Error,
            _ => Self::Info,
        }
    }
}

static LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Initialize the logger with configuration
///
/// The level is applied on every call; log files only on the first.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    set_level(Level::parse(&config.level));
    writer::init(config.log_file.as_deref(), config.error_log_file.as_deref()).map(|_| ())
}

pub fn set_level(level: Level) {
    LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn level() -> Level {
    Level::from_u8(LEVEL.load(Ordering::Relaxed))
}

fn enabled(level: Level) -> bool {
    level >= self::level()
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

pub fn log_info(message: &str) {
    if enabled(Level::Info) {
        write_info(message);
    }
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&format!("[WARN] {message}"));
    }
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_route_registered(method: &str, path: &str) {
    log_info(&format!("[Aeri][HTTP] Route registered: [{method}] {path}"));
}

pub fn log_port_in_use(port: u16, next: u16) {
    log_warning(&format!(
        "[Aeri][HTTP] Port {port} is in use, trying port {next}."
    ));
}

pub fn log_server_listening(addr: &SocketAddr) {
    log_info(&format!("[Aeri][HTTP] Server listening on http://{addr}"));
}

pub fn log_start_failed(err: &impl std::fmt::Display) {
    log_error(&format!("[Aeri][HTTP] Failed to start server: {err}"));
}

pub fn log_unhandled_error(method: &str, path: &str, err: &impl std::fmt::Display) {
    log_error(&format!(
        "[Aeri][HTTP] Unhandled error on {method} {path}: {err}"
    ));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("[Aeri][HTTP] Failed to serve connection: {err:?}"));
}

pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

/// Tagged logging handle carried by handler contexts.
///
/// Writes through the same writer and level filter as the `log_*`
/// functions, prefixing every line with its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    tag: String,
}

impl Logger {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn line(&self, message: &str) -> String {
        format!("{} {message}", self.tag)
    }

    pub fn debug(&self, message: &str) {
        log_debug(&self.line(message));
    }

    pub fn info(&self, message: &str) {
        log_info(&self.line(message));
    }

    pub fn warning(&self, message: &str) {
        log_warning(&self.line(message));
    }

    pub fn error(&self, message: &str) {
        log_error(&self.line(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("DEBUG"), Level::Debug);
        assert_eq!(Level::parse("warning"), Level::Warn);
        assert_eq!(Level::parse("error"), Level::Error);
        assert_eq!(Level::parse("verbose"), Level::Info);
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error > Level::Warn);
        assert!(Level::Warn > Level::Info);
        assert_eq!(Level::from_u8(Level::Warn as u8), Level::Warn);
    }

    #[test]
    fn test_logger_prefixes_tag() {
        let logger = Logger::new("[Aeri][HTTP]");
        assert_eq!(logger.tag(), "[Aeri][HTTP]");
        assert_eq!(logger.line("GET /x done"), "[Aeri][HTTP] GET /x done");
    }
}
