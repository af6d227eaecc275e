//! HTTP layer module
//!
//! Request/response primitives consumed by the dispatcher, the server's own
//! response builders and the error boundary.

pub mod error_boundary;
pub mod reply;
pub mod request;
pub mod response;

pub use error_boundary::handle_error;
pub use reply::{Next, NextState, Reply};
pub use request::HttpRequest;
pub use response::{build_204_response, build_404_response, build_413_response, build_json_response};
