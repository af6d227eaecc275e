//! Signature dispatcher: invoke a handler with the arguments its convention
//! asks for, then turn the outcome into exactly one response or one
//! continuation call.

use super::context::{HttpContext, WorkerContext};
use super::convention::{Handler, HandlerFuture};
use super::output::{HandlerOutput, HandlerResult};
use crate::core::Core;
use crate::error::HandlerError;
use crate::http::{HttpRequest, Next, Reply};
use crate::logger;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Run `handler` for one request.
///
/// On success a returned value is written as JSON unless the handler already
/// wrote the response itself. Errors and panics go to `next`; this function
/// never writes an error response.
pub async fn dispatch(
    handler: &Handler,
    core: Arc<Core>,
    req: Arc<HttpRequest>,
    res: Reply,
    next: Next,
) {
    let invocation = {
        let (res, next) = (res.clone(), next.clone());
        AssertUnwindSafe(async move { invoke(handler, core, req, res, next).await })
    };

    match invocation.catch_unwind().await {
        Ok(Ok(Some(value))) => {
            if res.headers_sent() {
                logger::log_debug("Handler returned a value after writing the response; ignored");
            } else if let Err(err) = res.json(&value) {
                next.fail(err);
            }
        }
        Ok(Ok(None)) => {}
        Ok(Err(err)) => next.fail(err),
        Err(panic) => next.fail(HandlerError::from_panic(panic.as_ref())),
    }
}

fn invoke(
    handler: &Handler,
    core: Arc<Core>,
    req: Arc<HttpRequest>,
    res: Reply,
    next: Next,
) -> HandlerFuture {
    match handler {
        Handler::Plain(f) => f(),
        Handler::Context(f) => f(HttpContext::new(core, req, res, next)),
        Handler::LegacyTwoArg(f) => f(req, res),
        Handler::LegacyThreeArg(f) => f(req, res, next),
    }
}

type WorkerFn = dyn Fn(WorkerContext) -> HandlerFuture + Send + Sync;

/// Handler for non-HTTP triggers.
#[derive(Clone)]
pub struct WorkerHandler(Arc<WorkerFn>);

impl WorkerHandler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerOutput,
    {
        Self(Arc::new(move |ctx| {
            let fut = f(ctx);
            Box::pin(async move { fut.await.into_result() })
        }))
    }
}

impl fmt::Debug for WorkerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WorkerHandler")
    }
}

/// Run a worker handler, converting panics into errors.
pub async fn invoke_worker(handler: &WorkerHandler, ctx: WorkerContext) -> HandlerResult {
    let job_id = ctx.job_id.clone();
    let fut = AssertUnwindSafe(async move { (handler.0)(ctx).await });
    let result = match fut.catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(HandlerError::from_panic(panic.as_ref())),
    };
    if let Err(err) = &result {
        logger::log_warning(&format!("[Aeri][Worker] Job {job_id} failed: {err}"));
    }
    result
}
