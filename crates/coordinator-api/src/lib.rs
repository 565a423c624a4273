//! # Coordinator API
//!
//! Application layer wiring the coordinator's core crates into a running
//! service: the HTTP inbound surface, the RPC `Route` adapter, the
//! RoutingEngine/Dispatcher orchestration, and Prometheus metrics exposition.

pub mod api;
pub mod bootstrap;
pub mod dispatcher;
pub mod monitoring;
pub mod protocol_clients;
pub mod routing_engine;
pub mod state;

pub use bootstrap::{bootstrap, Bootstrapped};
pub use state::AppState;

#[cfg(any(test, feature = "test-util"))]
pub use protocol_clients::MockProtocolClient;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
