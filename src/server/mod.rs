// Server module
// Listener creation, per-connection serving and the HTTP lifecycle

pub mod connection;
pub mod lifecycle;
pub mod listener;
pub mod service;

pub use lifecycle::{HttpModule, HttpOptions, ServerState};
pub use listener::create_listener;
