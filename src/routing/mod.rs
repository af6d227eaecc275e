//! Routing module
//!
//! - Route table construction from logic blocks
//! - Method + path-pattern matching in registration order

mod matcher;
mod table;

pub use matcher::{find_route, PathPattern};
pub use table::{build_routes, resolve_route, HttpMethod, RouteEntry};
