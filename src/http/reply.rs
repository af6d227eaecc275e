//! Response handle and error continuation shared between the dispatcher and
//! the handler it invokes.

use crate::error::HandlerError;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Response};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug)]
struct ReplyState {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    sent: bool,
}

/// Outbound response handle.
///
/// Cloning shares the same response. The first `send`/`json`/`end` writes it;
/// later writes are dropped with a warning.
#[derive(Debug, Clone)]
pub struct Reply {
    inner: Arc<Mutex<ReplyState>>,
}

impl Default for Reply {
    fn default() -> Self {
        Self::new()
    }
}

impl Reply {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ReplyState {
                status: 200,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                sent: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReplyState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status code used by the first write; ignored once sent
    pub fn status(&self, code: u16) -> &Self {
        let mut state = self.lock();
        if !state.sent {
            state.status = code;
        }
        drop(state);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.lock().status
    }

    /// Invalid header names or values are logged and ignored
    pub fn set_header(&self, name: &str, value: &str) -> &Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.lock().headers.insert(name, value);
            }
            _ => logger::log_warning(&format!("Ignoring invalid response header {name}")),
        }
        self
    }

    pub fn headers_sent(&self) -> bool {
        self.lock().sent
    }

    /// Send a body; text content type unless one was set
    pub fn send(&self, body: impl Into<Bytes>) {
        self.write(body.into(), "text/plain; charset=utf-8", false);
    }

    /// Serialize `value` and send it as JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), HandlerError> {
        let body = serde_json::to_vec(value)?;
        self.write(Bytes::from(body), JSON_CONTENT_TYPE, true);
        Ok(())
    }

    /// Send an empty body
    pub fn end(&self) {
        self.write(Bytes::new(), "text/plain; charset=utf-8", false);
    }

    fn write(&self, body: Bytes, content_type: &'static str, force_content_type: bool) {
        let mut state = self.lock();
        if state.sent {
            drop(state);
            logger::log_warning("Response already sent, ignoring additional write");
            return;
        }
        if force_content_type || (!body.is_empty() && !state.headers.contains_key(CONTENT_TYPE)) {
            state
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        state.body = body;
        state.sent = true;
    }

    /// The written response, or `None` if nothing was sent
    pub(crate) fn to_response(&self) -> Option<Response<Full<Bytes>>> {
        let state = self.lock();
        if !state.sent {
            return None;
        }
        let mut builder = Response::builder().status(state.status);
        for (name, value) in &state.headers {
            builder = builder.header(name, value);
        }
        Some(builder.body(Full::new(state.body.clone())).unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build handler response: {e}"));
            Response::new(Full::new(Bytes::new()))
        }))
    }
}

/// What a handler did with its continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextState {
    /// Not called
    Pending,
    /// Called without an error: try the next matching route
    Passed,
    /// Called with an error: hand it to the error boundary
    Failed(HandlerError),
}

/// Continuation for legacy handlers. Only the first call counts.
#[derive(Debug, Clone)]
pub struct Next {
    inner: Arc<Mutex<NextState>>,
}

impl Default for Next {
    fn default() -> Self {
        Self::new()
    }
}

impl Next {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(NextState::Pending)),
        }
    }

    /// `next()` or `next(err)`
    pub fn call(&self, err: Option<HandlerError>) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != NextState::Pending {
            drop(state);
            match err {
                Some(err) => logger::log_warning(&format!(
                    "Continuation already called, dropping error: {err}"
                )),
                None => logger::log_warning("Continuation already called"),
            }
            return;
        }
        *state = match err {
            Some(err) => NextState::Failed(err),
            None => NextState::Passed,
        };
    }

    pub fn pass(&self) {
        self.call(None);
    }

    pub fn fail(&self, err: impl Into<HandlerError>) {
        self.call(Some(err.into()));
    }

    pub fn is_called(&self) -> bool {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) != NextState::Pending
    }

    pub fn state(&self) -> NextState {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
