//! Handler calling conventions.
//!
//! Each handler is registered with the convention it expects, fixed once from
//! its Rust signature. The dispatcher never guesses at call time.

use super::context::HttpContext;
use super::output::{HandlerOutput, HandlerResult};
use crate::http::{HttpRequest, Next, Reply};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

type PlainFn = dyn Fn() -> HandlerFuture + Send + Sync;
type ContextFn = dyn Fn(HttpContext) -> HandlerFuture + Send + Sync;
type TwoArgFn = dyn Fn(Arc<HttpRequest>, Reply) -> HandlerFuture + Send + Sync;
type ThreeArgFn = dyn Fn(Arc<HttpRequest>, Reply, Next) -> HandlerFuture + Send + Sync;

/// Calling convention of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// No arguments
    Plain,
    /// A single [`HttpContext`]
    Context,
    /// Request and response
    LegacyTwoArg,
    /// Request, response and error continuation
    LegacyThreeArg,
}

impl Convention {
    /// Convention for a declared parameter count; anything above two is
    /// the three-argument form.
    pub const fn from_arity(params: usize) -> Self {
        match params {
            0 => Self::Plain,
            1 => Self::Context,
            2 => Self::LegacyTwoArg,
            _ => Self::LegacyThreeArg,
        }
    }

    pub const fn arity(self) -> usize {
        match self {
            Self::Plain => 0,
            Self::Context => 1,
            Self::LegacyTwoArg => 2,
            Self::LegacyThreeArg => 3,
        }
    }
}

/// A type-erased handler tagged with its calling convention.
#[derive(Clone)]
pub enum Handler {
    Plain(Arc<PlainFn>),
    Context(Arc<ContextFn>),
    LegacyTwoArg(Arc<TwoArgFn>),
    LegacyThreeArg(Arc<ThreeArgFn>),
}

impl Handler {
    /// Wrap any supported function, inferring the convention from its signature.
    pub fn new<Args, H: IntoHandler<Args>>(handler: H) -> Self {
        handler.into_handler()
    }

    pub fn plain<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerOutput,
    {
        Self::Plain(Arc::new(move || {
            let fut = f();
            Box::pin(async move { fut.await.into_result() })
        }))
    }

    pub fn context<F, Fut>(f: F) -> Self
    where
        F: Fn(HttpContext) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerOutput,
    {
        Self::Context(Arc::new(move |ctx| {
            let fut = f(ctx);
            Box::pin(async move { fut.await.into_result() })
        }))
    }

    pub fn legacy<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<HttpRequest>, Reply) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerOutput,
    {
        Self::LegacyTwoArg(Arc::new(move |req, res| {
            let fut = f(req, res);
            Box::pin(async move { fut.await.into_result() })
        }))
    }

    pub fn legacy_with_next<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<HttpRequest>, Reply, Next) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerOutput,
    {
        Self::LegacyThreeArg(Arc::new(move |req, res, next| {
            let fut = f(req, res, next);
            Box::pin(async move { fut.await.into_result() })
        }))
    }

    /// Synchronous zero-argument handler
    pub fn sync<F, R>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        Self::Plain(Arc::new(move || {
            let result = f().into_result();
            Box::pin(std::future::ready(result))
        }))
    }

    /// Synchronous context handler
    pub fn sync_context<F, R>(f: F) -> Self
    where
        F: Fn(HttpContext) -> R + Send + Sync + 'static,
        R: HandlerOutput,
    {
        Self::Context(Arc::new(move |ctx| {
            let result = f(ctx).into_result();
            Box::pin(std::future::ready(result))
        }))
    }

    pub const fn convention(&self) -> Convention {
        match self {
            Self::Plain(_) => Convention::Plain,
            Self::Context(_) => Convention::Context,
            Self::LegacyTwoArg(_) => Convention::LegacyTwoArg,
            Self::LegacyThreeArg(_) => Convention::LegacyThreeArg,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.convention()).finish()
    }
}

/// Functions that can become a [`Handler`]. `Args` only disambiguates the
/// implementations; it is the parameter list of the function.
pub trait IntoHandler<Args> {
    fn into_handler(self) -> Handler;
}

impl IntoHandler<Handler> for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

impl<F, Fut> IntoHandler<()> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: HandlerOutput,
{
    fn into_handler(self) -> Handler {
        Handler::plain(self)
    }
}

impl<F, Fut> IntoHandler<(HttpContext,)> for F
where
    F: Fn(HttpContext) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: HandlerOutput,
{
    fn into_handler(self) -> Handler {
        Handler::context(self)
    }
}

impl<F, Fut> IntoHandler<(Arc<HttpRequest>, Reply)> for F
where
    F: Fn(Arc<HttpRequest>, Reply) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: HandlerOutput,
{
    fn into_handler(self) -> Handler {
        Handler::legacy(self)
    }
}

impl<F, Fut> IntoHandler<(Arc<HttpRequest>, Reply, Next)> for F
where
    F: Fn(Arc<HttpRequest>, Reply, Next) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: HandlerOutput,
{
    fn into_handler(self) -> Handler {
        Handler::legacy_with_next(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_convention_from_arity() {
        assert_eq!(Convention::from_arity(0), Convention::Plain);
        assert_eq!(Convention::from_arity(1), Convention::Context);
        assert_eq!(Convention::from_arity(2), Convention::LegacyTwoArg);
        assert_eq!(Convention::from_arity(3), Convention::LegacyThreeArg);
        assert_eq!(Convention::from_arity(5), Convention::LegacyThreeArg);
        assert_eq!(Convention::LegacyTwoArg.arity(), 2);
    }

    #[test]
    fn test_inferred_conventions() {
        let plain = Handler::new(|| async { json!({"ok": true}) });
        let ctx = Handler::new(|ctx: HttpContext| async move { Value::from(ctx.kind().as_str()) });
        let two = Handler::new(|_req: Arc<HttpRequest>, res: Reply| async move { res.end() });
        let three = Handler::new(|_req: Arc<HttpRequest>, _res: Reply, next: Next| async move {
            next.pass();
        });

        assert_eq!(plain.convention(), Convention::Plain);
        assert_eq!(ctx.convention(), Convention::Context);
        assert_eq!(two.convention(), Convention::LegacyTwoArg);
        assert_eq!(three.convention(), Convention::LegacyThreeArg);
        assert_eq!(Handler::new(plain).convention(), Convention::Plain);
    }

    #[test]
    fn test_sync_constructors() {
        assert_eq!(
            Handler::sync(|| json!({"message": "hi"})).convention(),
            Convention::Plain
        );
        assert_eq!(
            Handler::sync_context(|ctx: HttpContext| ctx.body).convention(),
            Convention::Context
        );
    }
}
