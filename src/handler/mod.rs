//! Handler module
//!
//! Calling conventions, context values and the signature dispatcher that
//! connects a matched route to user code.

pub mod context;
pub mod convention;
pub mod dispatch;
pub mod output;

pub use context::{
    ContextKind, DispatchContext, EventInfo, HttpContext, JobInfo, RpcInfo, ScheduleInfo,
    WorkerContext,
};
pub use convention::{Convention, Handler, HandlerFuture, IntoHandler};
pub use dispatch::{dispatch, invoke_worker, WorkerHandler};
pub use output::{HandlerOutput, HandlerResult, Json};
