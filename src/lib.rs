//! Aeri: a small bootstrap layer for HTTP microservices.
//!
//! Handlers are grouped into [`LogicBlock`]s together with declarative route
//! metadata. [`bootstrap`] turns the blocks into a route table, wraps every
//! handler in the signature dispatcher and binds an HTTP server, moving to the
//! next port when the preferred one is taken.

pub mod bootstrap;
pub mod config;
pub mod core;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod logic;
pub mod routing;
pub mod server;

pub use crate::bootstrap::{bootstrap, App, BootstrapOptions, Module};
pub use crate::core::Core;
pub use crate::error::{BindError, BootstrapError, HandlerError, LogicLoadError, RegistrationError};
pub use crate::handler::{
    dispatch, invoke_worker, Convention, ContextKind, DispatchContext, Handler, HandlerOutput,
    HttpContext, IntoHandler, Json, WorkerContext, WorkerHandler,
};
pub use crate::http::{HttpRequest, Next, Reply};
pub use crate::logic::{
    discover_logic, Flow, HandlerSet, HttpRouteConfig, LogicBlock, LogicSource, LogicValue,
    Middleware,
};
pub use crate::routing::{build_routes, HttpMethod, RouteEntry};
pub use crate::server::{HttpModule, HttpOptions, ServerState};
