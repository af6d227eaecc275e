//! Per-invocation context values.

use crate::core::Core;
use crate::http::{HttpRequest, Next, Reply};
use crate::logger::Logger;
use chrono::{DateTime, Utc};
use hyper::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Discriminant of a [`DispatchContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Http,
    Worker,
}

impl ContextKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value passed to context-convention handlers.
#[derive(Clone)]
pub struct HttpContext {
    pub core: Arc<Core>,
    pub req: Arc<HttpRequest>,
    pub res: Reply,
    pub next: Next,
    pub query: HashMap<String, String>,
    pub params: HashMap<String, String>,
    pub body: Value,
    pub headers: HeaderMap,
    pub logger: Logger,
}

impl HttpContext {
    pub fn new(core: Arc<Core>, req: Arc<HttpRequest>, res: Reply, next: Next) -> Self {
        Self {
            query: req.query.clone(),
            params: req.params.clone(),
            body: req.body.clone(),
            headers: req.headers.clone(),
            logger: Logger::new("[Aeri][HTTP]"),
            core,
            req,
            res,
            next,
        }
    }

    pub const fn kind(&self) -> ContextKind {
        ContextKind::Http
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpContext")
            .field("type", &self.kind())
            .field("method", &self.req.method)
            .field("path", &self.req.path())
            .field("params", &self.params)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub name: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcInfo {
    pub method: String,
    pub params: Vec<Value>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleInfo {
    pub name: String,
    pub scheduled_at: DateTime<Utc>,
    pub interval: Option<String>,
}

/// Value passed to handlers triggered outside HTTP (jobs, events, RPC,
/// schedules). Nothing in this crate schedules work yet; the shape is fixed
/// so the `_rpc`, `_job` and `_events` metadata have a target.
#[derive(Clone)]
pub struct WorkerContext {
    pub core: Arc<Core>,
    pub data: Value,
    pub job_id: String,
    pub attempts: u32,
    pub logger: Logger,
    progress: ProgressFn,
    pub job: Option<JobInfo>,
    pub event: Option<EventInfo>,
    pub rpc: Option<RpcInfo>,
    pub schedule: Option<ScheduleInfo>,
}

impl WorkerContext {
    pub fn new(core: Arc<Core>, job_id: impl Into<String>, data: Value) -> Self {
        Self {
            core,
            data,
            job_id: job_id.into(),
            attempts: 0,
            logger: Logger::new("[Aeri][Worker]"),
            progress: Arc::new(|_| {}),
            job: None,
            event: None,
            rpc: None,
            schedule: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Report completion percentage; values above 100 are clamped
    pub fn progress(&self, percent: u8) {
        (self.progress)(percent.min(100));
    }

    pub const fn kind(&self) -> ContextKind {
        ContextKind::Worker
    }
}

impl fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("type", &self.kind())
            .field("job_id", &self.job_id)
            .field("attempts", &self.attempts)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// Either context, tagged by [`ContextKind`].
#[derive(Debug, Clone)]
pub enum DispatchContext {
    Http(HttpContext),
    Worker(WorkerContext),
}

impl DispatchContext {
    pub const fn kind(&self) -> ContextKind {
        match self {
            Self::Http(_) => ContextKind::Http,
            Self::Worker(_) => ContextKind::Worker,
        }
    }

    pub fn core(&self) -> &Arc<Core> {
        match self {
            Self::Http(ctx) => &ctx.core,
            Self::Worker(ctx) => &ctx.core,
        }
    }
}

impl From<HttpContext> for DispatchContext {
    fn from(ctx: HttpContext) -> Self {
        Self::Http(ctx)
    }
}

impl From<WorkerContext> for DispatchContext {
    fn from(ctx: WorkerContext) -> Self {
        Self::Worker(ctx)
    }
}
