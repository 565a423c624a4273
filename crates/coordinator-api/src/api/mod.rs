//! HTTP inbound surface (§4.H): actix-web routes sharing [`AppState`] with
//! the RPC listener.

pub mod routes;
pub mod rpc_adapter;

pub use rpc_adapter::RouteHandlerAdapter;
