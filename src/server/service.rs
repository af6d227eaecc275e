// Request service module
// Reads the request, walks the route table and turns the outcome of the
// middleware chain and dispatcher into one response

use crate::core::Core;
use crate::error::HandlerError;
use crate::handler::dispatch;
use crate::http::{self, HttpRequest, Next, NextState, Reply};
use crate::logger::{self, AccessLogEntry};
use crate::logic::Flow;
use crate::routing::{find_route, HttpMethod, RouteEntry};
use futures::FutureExt;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_LENGTH};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Everything a connection needs to serve requests; read-only once built.
pub struct HttpApp {
    pub core: Arc<Core>,
    pub routes: Vec<RouteEntry>,
    pub production: bool,
    pub max_body_size: usize,
    pub access_log: bool,
    pub access_log_format: String,
}

impl HttpApp {
    pub fn new(core: Arc<Core>, routes: Vec<RouteEntry>) -> Self {
        let cfg = core.config();
        let production = cfg.is_production();
        let max_body_size = usize::try_from(cfg.http.max_body_size).unwrap_or(usize::MAX);
        let access_log = cfg.logging.access_log;
        let access_log_format = cfg.logging.access_log_format.clone();
        Self {
            core,
            routes,
            production,
            max_body_size,
            access_log,
            access_log_format,
        }
    }
}

/// Entry point for one HTTP request
pub async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    app: Arc<HttpApp>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.referer = header_string(&req, "referer");
    entry.user_agent = header_string(&req, "user-agent");

    let (parts, body) = req.into_parts();
    let response = match Limited::new(body, app.max_body_size).collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let method = parts.method.to_string();
            let path = parts.uri.path().to_string();
            match HttpRequest::from_parts(parts, &bytes, Some(peer_addr)) {
                Ok(request) => route_request(&app, request).await,
                Err(err) => http::handle_error(&method, &path, &err, app.production),
            }
        }
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!(
                "Request body too large (max: {} bytes)",
                app.max_body_size
            ));
            http::build_413_response()
        }
        Err(e) => {
            logger::log_error(&format!("Failed to read request body: {e}"));
            http::build_json_response(400, &serde_json::json!({ "message": "Bad Request" }))
        }
    };

    if app.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(hyper::body::Body::size_hint(response.body()).lower())
            .unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &app.access_log_format);
    }

    Ok(response)
}

fn header_string<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Run the first matching route; a route whose handler passes (`next()`
/// without an error) hands the request to the next matching one.
///
/// `HEAD` is served by the `GET` routes with the body dropped.
pub async fn route_request(app: &HttpApp, request: HttpRequest) -> Response<Full<Bytes>> {
    if request.method == Method::HEAD {
        let response = walk_routes(app, request, Some(HttpMethod::Get)).await;
        return without_body(response);
    }
    let method = HttpMethod::from_hyper(&request.method);
    walk_routes(app, request, method).await
}

async fn walk_routes(
    app: &HttpApp,
    request: HttpRequest,
    method: Option<HttpMethod>,
) -> Response<Full<Bytes>> {
    let method_name = request.method.to_string();
    let path = request.path().to_string();
    let Some(method) = method else {
        return http::build_404_response(&method_name, &path);
    };

    let mut start = 0;
    while let Some((index, params)) = find_route(&app.routes, method, &path, start) {
        let route = &app.routes[index];
        let mut req = request.clone();
        req.params = params;
        let res = Reply::new();

        let req = match run_middlewares(route, req, &res).await {
            Ok(Some(req)) => req,
            Ok(None) => return finish(&res),
            Err(err) => return http::handle_error(&method_name, &path, &err, app.production),
        };

        let next = Next::new();
        dispatch(
            &route.handler,
            Arc::clone(&app.core),
            Arc::new(req),
            res.clone(),
            next.clone(),
        )
        .await;

        match next.state() {
            NextState::Failed(err) => {
                if res.headers_sent() {
                    logger::log_unhandled_error(&method_name, &path, &err);
                    return finish(&res);
                }
                return http::handle_error(&method_name, &path, &err, app.production);
            }
            NextState::Passed if !res.headers_sent() => start = index + 1,
            _ => return finish(&res),
        }
    }

    http::build_404_response(&method_name, &path)
}

/// Run the route's middlewares in order. `None` means one of them halted
/// the chain; errors and panics come back as `Err`.
async fn run_middlewares(
    route: &RouteEntry,
    mut req: HttpRequest,
    res: &Reply,
) -> Result<Option<HttpRequest>, HandlerError> {
    for middleware in &route.middlewares {
        let step = std::panic::catch_unwind(AssertUnwindSafe(|| middleware.call(req, res.clone())))
            .map_err(|panic| HandlerError::from_panic(panic.as_ref()))?;

        match AssertUnwindSafe(step).catch_unwind().await {
            Ok(Ok(Flow::Next(next_req))) => req = next_req,
            Ok(Ok(Flow::Halt)) => return Ok(None),
            Ok(Err(err)) => return Err(err),
            Err(panic) => return Err(HandlerError::from_panic(panic.as_ref())),
        }
    }
    Ok(Some(req))
}

/// Keep status and headers, advertise the length the body would have had
fn without_body(response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let (mut parts, body) = response.into_parts();
    if let Some(len) = hyper::body::Body::size_hint(&body).exact() {
        parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }
    Response::from_parts(parts, Full::new(Bytes::new()))
}

/// The handler's response, or 204 if it finished without writing one
fn finish(res: &Reply) -> Response<Full<Bytes>> {
    res.to_response().unwrap_or_else(http::build_204_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, HttpContext, Json};
    use crate::logic::{HttpRouteConfig, LogicBlock, Middleware};
    use crate::routing::build_routes;
    use serde_json::{json, Value};

    fn app(blocks: &[LogicBlock], production: bool) -> HttpApp {
        let mut app = HttpApp::new(Arc::new(Core::with_defaults()), build_routes(blocks));
        app.production = production;
        app
    }

    fn get(path: &str) -> HttpRequest {
        HttpRequest::new(Method::GET, path.parse().unwrap())
    }

    async fn body_of(resp: Response<Full<Bytes>>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_first_registered_block_wins() {
        let first = LogicBlock::new()
            .handler("x", Handler::sync(|| json!({"from": "first"})))
            .route("x", HttpRouteConfig::get("/x"));
        let second = LogicBlock::new()
            .handler("x", Handler::sync(|| json!({"from": "second"})))
            .route("x", HttpRouteConfig::get("/x"));
        let app = app(&[first, second], false);

        let resp = route_request(&app, get("/x")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_of(resp).await, json!({"from": "first"}));
    }

    #[tokio::test]
    async fn test_pass_falls_through() {
        let first = LogicBlock::new()
            .handler(
                "x",
                Handler::legacy_with_next(|_req, _res, next: Next| async move { next.pass() }),
            )
            .route("x", HttpRouteConfig::get("/x"));
        let second = LogicBlock::new()
            .handler("y", Handler::sync(|| json!({"from": "second"})))
            .route("y", HttpRouteConfig::get("/x"));
        let app = app(&[first, second], false);

        let resp = route_request(&app, get("/x")).await;
        assert_eq!(body_of(resp).await, json!({"from": "second"}));
    }

    #[tokio::test]
    async fn test_params_reach_context() {
        let block = LogicBlock::new()
            .handler(
                "user",
                Handler::new(|ctx: HttpContext| async move {
                    Json(json!({ "id": ctx.param("id") }))
                }),
            )
            .route("user", HttpRouteConfig::get("/users/:id"));
        let resp = route_request(&app(&[block], false), get("/users/7")).await;
        assert_eq!(body_of(resp).await, json!({"id": "7"}));
    }

    #[tokio::test]
    async fn test_unmatched_is_404() {
        let resp = route_request(&app(&[], false), get("/nothing")).await;
        assert_eq!(resp.status(), 404);
        let options = HttpRequest::new(Method::OPTIONS, "/nothing".parse().unwrap());
        assert_eq!(route_request(&app(&[], false), options).await.status(), 404);
    }

    #[tokio::test]
    async fn test_error_redaction() {
        let block = || {
            LogicBlock::new()
                .handler(
                    "boom",
                    Handler::plain(|| async { Err::<Value, _>(HandlerError::new("x")) }),
                )
                .route("boom", HttpRouteConfig::get("/boom"))
        };

        let resp = route_request(&app(&[block()], true), get("/boom")).await;
        assert_eq!(resp.status(), 500);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(!String::from_utf8_lossy(&bytes).contains('x'));

        let resp = route_request(&app(&[block()], false), get("/boom")).await;
        assert_eq!(resp.status(), 500);
        assert_eq!(body_of(resp).await["error"], "x");
    }

    #[tokio::test]
    async fn test_middleware_halts_and_errors() {
        let guarded = LogicBlock::new()
            .handler("secret", Handler::sync(|| json!({"secret": true})))
            .handler("broken", Handler::sync(|| json!({})))
            .route(
                "secret",
                HttpRouteConfig::get("/secret").middleware(Middleware::sync(|req, res| {
                    if req.header("authorization").is_none() {
                        res.status(401).json(&json!({"message": "Unauthorized"}))?;
                        return Ok(Flow::Halt);
                    }
                    Ok(Flow::Next(req))
                })),
            )
            .route(
                "broken",
                HttpRouteConfig::get("/broken")
                    .middleware(Middleware::sync(|_, _| Err(HandlerError::new("mw failed")))),
            );
        let app = app(&[guarded], false);

        let resp = route_request(&app, get("/secret")).await;
        assert_eq!(resp.status(), 401);

        let mut authed = get("/secret");
        authed
            .headers
            .insert("authorization", "Bearer t".parse().unwrap());
        let resp = route_request(&app, authed).await;
        assert_eq!(body_of(resp).await, json!({"secret": true}));

        let resp = route_request(&app, get("/broken")).await;
        assert_eq!(resp.status(), 500);
        assert_eq!(body_of(resp).await["error"], "mw failed");
    }

    #[tokio::test]
    async fn test_silent_handler_gets_204() {
        let block = LogicBlock::new()
            .handler("noop", Handler::plain(|| async {}))
            .route("noop", HttpRouteConfig::post("/noop"));
        let req = HttpRequest::new(Method::POST, "/noop".parse().unwrap());
        let resp = route_request(&app(&[block], false), req).await;
        assert_eq!(resp.status(), 204);
    }

    #[tokio::test]
    async fn test_middleware_panic_becomes_500() {
        let block = LogicBlock::new()
            .handler("guarded", Handler::sync(|| json!({"reached": true})))
            .handler("lazy", Handler::sync(|| json!({"reached": true})))
            .route(
                "guarded",
                HttpRouteConfig::get("/guarded")
                    .middleware(Middleware::sync(|_, _| panic!("mw boom"))),
            )
            .route(
                "lazy",
                HttpRouteConfig::get("/lazy").middleware(Middleware::new(
                    |req: HttpRequest, _res: Reply| async move {
                        tokio::task::yield_now().await;
                        if req.path() == "/lazy" {
                            panic!("late boom");
                        }
                        Ok(Flow::Next(req))
                    },
                )),
            );
        let app = Arc::new(app(&[block], false));

        // Run on a spawned task so an escaping panic would show up as a JoinError
        let shared = Arc::clone(&app);
        let resp = tokio::spawn(async move { route_request(&shared, get("/guarded")).await })
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        assert!(body_of(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("mw boom"));

        let resp = route_request(&app, get("/lazy")).await;
        assert_eq!(resp.status(), 500);
        assert!(body_of(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("late boom"));
    }

    #[tokio::test]
    async fn test_async_middleware_chain() {
        let block = LogicBlock::new()
            .handler(
                "me",
                Handler::new(|ctx: HttpContext| async move {
                    Json(json!({ "user": ctx.param("user") }))
                }),
            )
            .route(
                "me",
                HttpRouteConfig::get("/me")
                    .middleware(Middleware::new(|mut req: HttpRequest, _res: Reply| async move {
                        // Stand-in for a token lookup
                        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                        req.params.insert("user".to_string(), "ada".to_string());
                        Ok(Flow::Next(req))
                    }))
                    .middleware(Middleware::new(|req: HttpRequest, res: Reply| async move {
                        if req.param("user").is_some() {
                            Ok(Flow::Next(req))
                        } else {
                            res.status(401).end();
                            Ok(Flow::Halt)
                        }
                    })),
            );

        let resp = route_request(&app(&[block], false), get("/me")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_of(resp).await, json!({"user": "ada"}));
    }

    #[tokio::test]
    async fn test_head_uses_get_route_without_body() {
        let block = LogicBlock::new()
            .handler("hello", Handler::sync(|| json!({"message": "hi"})))
            .route("hello", HttpRouteConfig::get("/hello"));
        let app = app(&[block], false);

        let head = HttpRequest::new(Method::HEAD, "/hello".parse().unwrap());
        let resp = route_request(&app, head).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[CONTENT_LENGTH], r#"{"message":"hi"}"#.len().to_string());
        assert!(resp.into_body().collect().await.unwrap().to_bytes().is_empty());

        let head = HttpRequest::new(Method::HEAD, "/missing".parse().unwrap());
        assert_eq!(route_request(&app, head).await.status(), 404);
    }
}
