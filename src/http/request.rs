//! Inbound request representation handed to handlers and middlewares.

use crate::error::HandlerError;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;

/// A fully read request: body parsed, query decoded, path parameters filled
/// in once a route matched.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub params: HashMap<String, String>,
    /// JSON or urlencoded body; an empty object otherwise
    pub body: Value,
    pub remote_addr: Option<SocketAddr>,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        let query = parse_query(uri.query());
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            query,
            params: HashMap::new(),
            body: Value::Object(Map::new()),
            remote_addr: None,
        }
    }

    /// Build from hyper request parts and the collected body.
    pub fn from_parts(
        parts: Parts,
        body: &Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Self, HandlerError> {
        let mut request = Self::new(parts.method, parts.uri);
        request.body = parse_body(&parts.headers, body)?;
        request.headers = parts.headers;
        request.remote_addr = remote_addr;
        Ok(request)
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

/// Decode a query string; repeated keys keep the last value
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn parse_body(headers: &HeaderMap, body: &Bytes) -> Result<Value, HandlerError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if body.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    if content_type.starts_with("application/json") || content_type.contains("+json") {
        return serde_json::from_slice(body)
            .map_err(|e| HandlerError::new(format!("Invalid JSON body: {e}")));
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let form = url::form_urlencoded::parse(body)
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<String, Value>>();
        return Ok(Value::Object(form));
    }

    Ok(Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Request;
    use serde_json::json;

    fn parts(content_type: Option<&str>, uri: &str) -> Parts {
        let mut builder = Request::builder().method(Method::POST).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_query_decoding() {
        let req = HttpRequest::new(Method::GET, "/search?q=hello+world&page=2".parse().unwrap());
        assert_eq!(req.query_param("q"), Some("hello world"));
        assert_eq!(req.query_param("page"), Some("2"));
        assert_eq!(req.path(), "/search");
    }

    #[test]
    fn test_json_body() {
        let body = Bytes::from(r#"{"name":"ada"}"#);
        let req =
            HttpRequest::from_parts(parts(Some("application/json"), "/users"), &body, None).unwrap();
        assert_eq!(req.body, json!({"name": "ada"}));
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_malformed_json_body() {
        let body = Bytes::from("{not json");
        let err = HttpRequest::from_parts(parts(Some("application/json"), "/users"), &body, None)
            .unwrap_err();
        assert!(err.message().starts_with("Invalid JSON body"));
    }

    #[test]
    fn test_urlencoded_body() {
        let body = Bytes::from("name=ada&lang=rust%21");
        let req = HttpRequest::from_parts(
            parts(Some("application/x-www-form-urlencoded"), "/users"),
            &body,
            None,
        )
        .unwrap();
        assert_eq!(req.body, json!({"name": "ada", "lang": "rust!"}));
    }

    #[test]
    fn test_unknown_body_is_empty_object() {
        let body = Bytes::from("plain text");
        let req = HttpRequest::from_parts(parts(Some("text/plain"), "/"), &body, None).unwrap();
        assert_eq!(req.body, json!({}));
    }
}
