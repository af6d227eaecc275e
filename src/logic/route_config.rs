//! Route metadata attached to a handler name.

use crate::error::HandlerError;
use crate::http::{HttpRequest, Reply};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a middleware wants to happen next.
#[derive(Debug, Clone)]
pub enum Flow {
    /// Run the next middleware, then the handler, with this request
    Next(HttpRequest),
    /// Stop here; the middleware owns the response
    Halt,
}

type MiddlewareFn = dyn Fn(HttpRequest, Reply) -> BoxFuture<'static, Result<Flow, HandlerError>>
    + Send
    + Sync;

/// A request-processing step run before a route's handler.
///
/// The middleware takes the request by value and hands it on, possibly
/// edited, through [`Flow::Next`].
#[derive(Clone)]
pub struct Middleware(Arc<MiddlewareFn>);

impl Middleware {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(HttpRequest, Reply) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow, HandlerError>> + Send + 'static,
    {
        Self(Arc::new(move |req, res| Box::pin(f(req, res))))
    }

    /// Middleware that does no async work
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(HttpRequest, &Reply) -> Result<Flow, HandlerError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |req, res| {
            let result = f(req, &res);
            Box::pin(std::future::ready(result))
        }))
    }

    pub fn call(&self, req: HttpRequest, res: Reply) -> BoxFuture<'static, Result<Flow, HandlerError>> {
        (self.0)(req, res)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

/// Per-handler route descriptor.
///
/// `method` defaults to GET and `path` to `/<function name>` when the route
/// table is built.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HttpRouteConfig {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(skip)]
    pub middlewares: Vec<Middleware>,
}

impl HttpRouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(path: &str) -> Self {
        Self::new().method("get").path(path)
    }

    pub fn post(path: &str) -> Self {
        Self::new().method("post").path(path)
    }

    pub fn put(path: &str) -> Self {
        Self::new().method("put").path(path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new().method("delete").path(path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new().method("patch").path(path)
    }

    #[must_use]
    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;

    #[test]
    fn test_deserialize_partial() {
        let cfg: HttpRouteConfig = serde_json::from_str(r#"{"path": "/x"}"#).unwrap();
        assert_eq!(cfg.method, None);
        assert_eq!(cfg.path.as_deref(), Some("/x"));
        assert!(cfg.middlewares.is_empty());
    }

    #[test]
    fn test_builder() {
        let cfg = HttpRouteConfig::post("/orders")
            .middleware(Middleware::sync(|req, _| Ok(Flow::Next(req))));
        assert_eq!(cfg.method.as_deref(), Some("post"));
        assert_eq!(cfg.middlewares.len(), 1);
    }

    #[tokio::test]
    async fn test_middleware_can_edit_request() {
        let mw = Middleware::sync(|mut req, _res| {
            req.params.insert("user".to_string(), "ada".to_string());
            Ok(Flow::Next(req))
        });
        let req = HttpRequest::new(Method::GET, "/".parse().unwrap());
        let Ok(Flow::Next(req)) = mw.call(req, Reply::new()).await else {
            panic!("middleware should continue");
        };
        assert_eq!(req.param("user"), Some("ada"));
    }

    #[tokio::test]
    async fn test_async_middleware() {
        let mw = Middleware::new(|req: HttpRequest, res: Reply| async move {
            tokio::task::yield_now().await;
            if req.header("x-token").is_some() {
                Ok(Flow::Next(req))
            } else {
                res.status(403).end();
                Ok(Flow::Halt)
            }
        });

        let reply = Reply::new();
        let req = HttpRequest::new(Method::GET, "/".parse().unwrap());
        assert!(matches!(mw.call(req, reply.clone()).await, Ok(Flow::Halt)));
        assert_eq!(reply.status_code(), 403);
        assert!(reply.headers_sent());
    }
}
