//! HTTP response building module
//!
//! Builders for the responses the server produces on its own, outside of
//! handler-written replies.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use serde_json::{json, Value};

/// Build a JSON response with the given status
pub fn build_json_response(status: u16, body: &Value) -> Response<Full<Bytes>> {
    let payload = serde_json::to_vec(body).unwrap_or_else(|e| {
        crate::logger::log_error(&format!("Failed to serialize response: {e}"));
        br#"{"message":"Internal Server Error"}"#.to_vec()
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(payload)))
        .unwrap_or_else(|e| {
            log_build_error(&status.to_string(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 204 No Content response
pub fn build_204_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(204)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("204", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response
pub fn build_404_response(method: &str, path: &str) -> Response<Full<Bytes>> {
    build_json_response(
        404,
        &json!({ "message": format!("Cannot {method} {path}") }),
    )
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_json_response(413, &json!({ "message": "Payload Too Large" }))
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
