//! Logic blocks: named handlers plus the metadata describing how they are
//! exposed.

use super::route_config::HttpRouteConfig;
use crate::handler::{Handler, IntoHandler, WorkerHandler};
use crate::logger;
use serde_json::Value;

/// Route metadata key
pub const HTTP_KEY: &str = "_http";
/// Alternative spelling of the route metadata key
pub const HTTP_KEY_ALT: &str = "@http";
pub const RPC_KEY: &str = "_rpc";
pub const JOB_KEY: &str = "_job";
pub const EVENTS_KEY: &str = "_events";

const RESERVED_KEYS: [&str; 5] = [HTTP_KEY, HTTP_KEY_ALT, RPC_KEY, JOB_KEY, EVENTS_KEY];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

/// A named member of a logic block.
#[derive(Debug, Clone)]
pub enum LogicValue {
    Handler(Handler),
    Worker(WorkerHandler),
    /// Anything that is not callable
    Data(Value),
}

/// Ordered mapping from function name to handler, with optional metadata.
#[derive(Debug, Clone, Default)]
pub struct LogicBlock {
    label: Option<String>,
    entries: Vec<(String, LogicValue)>,
    http: Option<Vec<(String, HttpRouteConfig)>>,
    rpc: Option<Vec<String>>,
    jobs: Option<Vec<String>>,
    events: Option<Vec<(String, Vec<String>)>>,
}

impl LogicBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A block labelled with where it came from, for log messages
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn handler<Args>(mut self, name: &str, handler: impl IntoHandler<Args>) -> Self {
        self.insert(name, LogicValue::Handler(handler.into_handler()));
        self
    }

    #[must_use]
    pub fn worker(mut self, name: &str, handler: WorkerHandler) -> Self {
        self.insert(name, LogicValue::Worker(handler));
        self
    }

    #[must_use]
    pub fn data(mut self, name: &str, value: Value) -> Self {
        self.insert(name, LogicValue::Data(value));
        self
    }

    /// Declare (or redeclare, keeping its position) the route of `name`
    #[must_use]
    pub fn route(mut self, name: &str, config: HttpRouteConfig) -> Self {
        self.set_route(name, config);
        self
    }

    #[must_use]
    pub fn rpc<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rpc = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn jobs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jobs = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn event(mut self, event: &str, handlers: Vec<String>) -> Self {
        let events = self.events.get_or_insert_with(Vec::new);
        match events.iter_mut().find(|(name, _)| name == event) {
            Some((_, existing)) => *existing = handlers,
            None => events.push((event.to_string(), handlers)),
        }
        self
    }

    /// Insert or replace a member, keeping the original position on replace.
    ///
    /// Reserved metadata names are stored but shadowed by the metadata.
    pub fn insert(&mut self, name: &str, value: LogicValue) {
        if is_reserved(name) {
            logger::log_warning(&format!(
                "[Aeri] \"{name}\" is a reserved metadata key; the value will never be routed"
            ));
        }
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn set_route(&mut self, name: &str, config: HttpRouteConfig) {
        let routes = self.http.get_or_insert_with(Vec::new);
        match routes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = config,
            None => routes.push((name.to_string(), config)),
        }
    }

    /// Look up a member. Reserved names always resolve to metadata, never to
    /// a value.
    pub fn get(&self, name: &str) -> Option<&LogicValue> {
        if is_reserved(name) {
            return None;
        }
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// The HTTP handler registered under `name`, if it is one
    pub fn http_handler(&self, name: &str) -> Option<&Handler> {
        match self.get(name) {
            Some(LogicValue::Handler(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn worker_handler(&self, name: &str) -> Option<&WorkerHandler> {
        match self.get(name) {
            Some(LogicValue::Worker(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &LogicValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Route metadata in declaration order
    pub fn http_routes(&self) -> Option<&[(String, HttpRouteConfig)]> {
        self.http.as_deref()
    }

    pub fn has_http_routes(&self) -> bool {
        self.http.is_some()
    }

    pub fn rpc_names(&self) -> Option<&[String]> {
        self.rpc.as_deref()
    }

    pub fn job_names(&self) -> Option<&[String]> {
        self.jobs.as_deref()
    }

    pub fn events(&self) -> Option<&[(String, Vec<String>)]> {
        self.events.as_deref()
    }

    /// Label for log lines: the source name or the registry position
    pub(crate) fn describe(&self, index: usize) -> String {
        match &self.label {
            Some(label) => format!("{label} (#{index})"),
            None => format!("logic #{index}"),
        }
    }
}
