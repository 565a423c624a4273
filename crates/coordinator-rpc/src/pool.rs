//! Pool of long-lived RPC connections keyed by `(serviceName, endpoint)`.
//!
//! Grounded on the teacher's `McpConnection`/client pool, which guards
//! connection creation behind a lock so concurrent callers never race to
//! create two connections to the same target. This pool additionally
//! serializes request/response pairs on each pooled connection with a
//! `tokio::sync::Mutex`, since [`crate::transport::FramedConnection`] is a
//! plain request/response stream rather than a multiplexed one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::protocol::{RpcRequest, RpcResponse};
use crate::transport::{FramedConnection, TransportError};

type PoolKey = (String, String);

pub struct RpcConnectionPool {
    connections: Mutex<HashMap<PoolKey, Arc<Mutex<FramedConnection>>>>,
}

impl RpcConnectionPool {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a cached connection or creates one, idempotently: concurrent
    /// callers for the same key never create two connections, because the
    /// whole lookup-or-insert happens under the pool's lock.
    async fn get_or_connect(
        &self,
        service_name: &str,
        endpoint: &str,
    ) -> Result<Arc<Mutex<FramedConnection>>, TransportError> {
        let key: PoolKey = (service_name.to_string(), endpoint.to_string());
        let mut connections = self.connections.lock().await;
        if let Some(conn) = connections.get(&key) {
            return Ok(conn.clone());
        }
        let conn = FramedConnection::connect(endpoint).await?;
        let conn = Arc::new(Mutex::new(conn));
        connections.insert(key, conn.clone());
        Ok(conn)
    }

    pub async fn call(
        &self,
        service_name: &str,
        endpoint: &str,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<RpcResponse, TransportError> {
        let conn = self.get_or_connect(service_name, endpoint).await?;
        let mut guard = conn.lock().await;
        match guard.call(request, timeout).await {
            Ok(response) => Ok(response),
            Err(e) => {
                // The connection may be dead; drop it so the next call
                // reconnects instead of repeatedly failing against it.
                drop(guard);
                self.connections.lock().await.remove(&(service_name.to_string(), endpoint.to_string()));
                Err(e)
            }
        }
    }

    pub async fn shutdown(&self) {
        self.connections.lock().await.clear();
    }
}

impl Default for RpcConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}
