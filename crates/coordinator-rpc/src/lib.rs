//! # Coordinator RPC
//!
//! The coordinator's internal binary-framed RPC protocol: a connection-pooled
//! client used by the Dispatcher to call backends that support RPC, and an
//! inbound `Route` listener for the single upstream caller that prefers
//! framing over HTTP (§4.G, §4.H of the design document).
//!
//! Framing and pooling patterns are generalized from the teacher's MCP
//! transport/client-pool machinery (`workflow-engine-mcp`), narrowed from
//! tool-call semantics to this system's `Route`/`Process` methods.

pub mod client;
pub mod pool;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::RpcClient;
pub use pool::RpcConnectionPool;
pub use server::{serve, RouteHandler};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
