//! Logic module
//!
//! Logic blocks (handlers plus route metadata) and the collaborator that
//! discovers them on disk.

pub mod block;
pub mod discovery;
pub mod route_config;

pub use block::{LogicBlock, LogicValue, EVENTS_KEY, HTTP_KEY, HTTP_KEY_ALT, JOB_KEY, RPC_KEY};
pub use discovery::{discover_logic, load_logic_file, load_sources, HandlerSet, LogicSource};
pub use route_config::{Flow, HttpRouteConfig, Middleware};
