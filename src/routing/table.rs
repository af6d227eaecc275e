//! Route table builder: joins each logic block's route metadata to its
//! handlers and produces the flat, ordered list the server registers.

use super::matcher::PathPattern;
use crate::error::RegistrationError;
use crate::handler::Handler;
use crate::logger;
use crate::logic::{HttpRouteConfig, LogicBlock, Middleware};
use std::fmt;

/// The five verbs a route may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Case-insensitive; `None` for anything unsupported
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }

    pub fn from_hyper(method: &hyper::Method) -> Option<Self> {
        Self::parse(method.as_str())
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved route ready for the server.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub method: HttpMethod,
    pub path: String,
    pub pattern: PathPattern,
    pub handler: Handler,
    pub middlewares: Vec<Middleware>,
    /// Function name the route was declared for
    pub function: String,
}

/// Resolve one metadata entry of `block`.
pub fn resolve_route(
    block: &LogicBlock,
    function: &str,
    config: &HttpRouteConfig,
) -> Result<RouteEntry, RegistrationError> {
    let handler = block
        .http_handler(function)
        .ok_or_else(|| RegistrationError::MissingHandler(function.to_string()))?;

    let raw_method = config.method.as_deref().unwrap_or("get");
    let method =
        HttpMethod::parse(raw_method).ok_or_else(|| RegistrationError::UnsupportedMethod {
            function: function.to_string(),
            method: raw_method.to_ascii_lowercase(),
        })?;

    let path = config
        .path
        .clone()
        .unwrap_or_else(|| format!("/{function}"));

    Ok(RouteEntry {
        method,
        pattern: PathPattern::parse(&path),
        path,
        handler: handler.clone(),
        middlewares: config.middlewares.clone(),
        function: function.to_string(),
    })
}

/// Build the route table in registry order, then metadata order within a
/// block. Invalid entries are logged and dropped; nothing here fails.
pub fn build_routes(blocks: &[LogicBlock]) -> Vec<RouteEntry> {
    logger::log_info("[Aeri][HTTP] Starting route registration...");
    let mut routes = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        let Some(metadata) = block.http_routes() else {
            logger::log_info(&format!(
                "[Aeri][HTTP] No route metadata in {}, skipping.",
                block.describe(index)
            ));
            continue;
        };

        for (function, config) in metadata {
            match resolve_route(block, function, config) {
                Ok(entry) => {
                    logger::log_route_registered(entry.method.as_str(), &entry.path);
                    routes.push(entry);
                }
                Err(e) => logger::log_warning(&format!(
                    "[Aeri][HTTP] {e} Skipping route in {}.",
                    block.describe(index)
                )),
            }
        }
    }

    logger::log_info(&format!(
        "[Aeri][HTTP] Total routes registered: {}",
        routes.len()
    ));
    routes
}
