//! `ProtocolClients` (§4.G): picks HTTP or RPC per candidate and dispatches
//! the Envelope under a caller-supplied deadline.
//!
//! The HTTP half is grounded on the teacher's `workflow_engine_mcp::clients::http`
//! POST-JSON-parse-response pattern; the RPC half simply forwards to
//! [`coordinator_rpc::RpcClient`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coordinator_core::{CoordinatorError, Envelope};
use coordinator_rpc::RpcClient;
use serde_json::Value;

/// RPC port = HTTP port + 51 (§4.G fallback heuristic), used only when a
/// candidate's record doesn't set `supportsRpc` explicitly.
const RPC_PORT_OFFSET: u16 = 51;

/// Dispatches one Envelope to one backend candidate over whichever protocol
/// applies. Abstracted behind a trait so the [`crate::dispatcher::Dispatcher`]
/// cascade can be exercised against a `mockall`-generated double instead of
/// real network calls.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn dispatch(
        &self,
        service_name: &str,
        endpoint: &str,
        supports_rpc: bool,
        envelope: &Envelope,
        timeout: Duration,
    ) -> Result<Value, CoordinatorError>;
}

pub struct ProtocolClients {
    http: reqwest::Client,
    rpc: RpcClient,
}

impl ProtocolClients {
    pub fn new(rpc_pool: Arc<coordinator_rpc::RpcConnectionPool>) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc: RpcClient::new(rpc_pool),
        }
    }
}

/// Dispatches `envelope` to `endpoint`, choosing RPC when `supports_rpc`
/// is set or the port-arithmetic heuristic indicates an RPC-capable port.
#[async_trait]
impl ProtocolClient for ProtocolClients {
    async fn dispatch(
        &self,
        service_name: &str,
        endpoint: &str,
        supports_rpc: bool,
        envelope: &Envelope,
        timeout: Duration,
    ) -> Result<Value, CoordinatorError> {
        if supports_rpc {
            let rpc_addr = rpc_address(endpoint)?;
            return self.rpc.process(service_name, &rpc_addr, envelope, timeout).await;
        }

        if let Some(rpc_addr) = rpc_port_heuristic(endpoint) {
            if let Ok(value) = self.rpc.process(service_name, &rpc_addr, envelope, timeout).await {
                return Ok(value);
            }
        }

        self.dispatch_http(service_name, endpoint, envelope, timeout).await
    }

    async fn dispatch_http(
        &self,
        service_name: &str,
        endpoint: &str,
        envelope: &Envelope,
        timeout: Duration,
    ) -> Result<Value, CoordinatorError> {
        let url = format!("{}/api/process", endpoint.trim_end_matches('/'));

        let response = tokio::time::timeout(
            timeout,
            self.http
                .post(&url)
                .header("X-Request-Id", envelope.request_id.clone())
                .header("X-Target-Service", service_name)
                .json(envelope)
                .send(),
        )
        .await
        .map_err(|_| CoordinatorError::BackendTimeout {
            elapsed_ms: timeout.as_millis() as u64,
        })?
        .map_err(CoordinatorError::from)?;

        if !response.status().is_success() {
            return Err(CoordinatorError::BackendError {
                message: format!("{} responded with {}", url, response.status()),
            });
        }

        response.json::<Value>().await.map_err(CoordinatorError::from)
    }
}

fn rpc_address(endpoint: &str) -> Result<String, CoordinatorError> {
    let parsed = url::Url::parse(endpoint).map_err(|e| CoordinatorError::InvalidUrl {
        message: format!("{endpoint}: {e}"),
    })?;
    let host = parsed.host_str().ok_or_else(|| CoordinatorError::InvalidUrl {
        message: format!("{endpoint} has no host"),
    })?;
    let port = parsed.port_or_known_default().unwrap_or(80);
    Ok(format!("{host}:{port}"))
}

fn rpc_port_heuristic(endpoint: &str) -> Option<String> {
    let parsed = url::Url::parse(endpoint).ok()?;
    let host = parsed.host_str()?;
    let port = parsed.port_or_known_default()?;
    Some(format!("{host}:{}", port + RPC_PORT_OFFSET))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_address_extracts_host_and_port() {
        assert_eq!(rpc_address("http://payments:4000").unwrap(), "payments:4000");
    }

    #[test]
    fn rpc_port_heuristic_adds_offset() {
        assert_eq!(rpc_port_heuristic("http://payments:4000").unwrap(), "payments:4051");
    }
}
