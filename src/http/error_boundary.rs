//! Terminal error handling: every error forwarded by the dispatcher or a
//! middleware ends here as a uniform 500.

use super::response::build_json_response;
use crate::error::HandlerError;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use serde_json::{json, Value};

pub const GENERIC_MESSAGE: &str = "Internal Server Error";

/// Client-visible body; the error text is only included outside production.
pub fn error_body(err: &HandlerError, production: bool) -> Value {
    if production {
        json!({ "message": GENERIC_MESSAGE })
    } else {
        json!({ "message": GENERIC_MESSAGE, "error": err.message() })
    }
}

/// Log the failure and build the 500 response. Never panics.
pub fn handle_error(
    method: &str,
    path: &str,
    err: &HandlerError,
    production: bool,
) -> Response<Full<Bytes>> {
    logger::log_unhandled_error(method, path, err);
    build_json_response(500, &error_body(err, production))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_production_redacts_detail() {
        let body = error_body(&HandlerError::new("x"), true);
        assert_eq!(body, json!({"message": "Internal Server Error"}));
        assert!(!body.to_string().contains('x'));
    }

    #[test]
    fn test_development_includes_detail() {
        let body = error_body(&HandlerError::new("x"), false);
        assert_eq!(body["error"], "x");
    }

    #[tokio::test]
    async fn test_handle_error_is_500() {
        let resp = handle_error("POST", "/orders", &HandlerError::new("db down"), false);
        assert_eq!(resp.status(), 500);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "db down");
    }
}
