//! RPC client side of `ProtocolClients` (§4.G): dispatches an `Envelope` to a
//! backend over the pooled RPC connection using the `Process` method.

use std::sync::Arc;
use std::time::Duration;

use coordinator_core::{CoordinatorError, Envelope};
use serde_json::Value;

use crate::pool::RpcConnectionPool;
use crate::protocol::{ProcessParams, RpcRequest, RpcResponse};

pub struct RpcClient {
    pool: Arc<RpcConnectionPool>,
}

impl RpcClient {
    pub fn new(pool: Arc<RpcConnectionPool>) -> Self {
        Self { pool }
    }

    pub async fn process(
        &self,
        service_name: &str,
        endpoint: &str,
        envelope: &Envelope,
        timeout: Duration,
    ) -> Result<Value, CoordinatorError> {
        let envelope_json = String::from_utf8(envelope.to_json()?).map_err(|e| CoordinatorError::TransportError {
            message: format!("envelope bytes were not utf-8: {e}"),
        })?;

        let request = RpcRequest::Process {
            id: envelope.request_id.clone(),
            params: ProcessParams { envelope_json },
        };

        let response = self
            .pool
            .call(service_name, endpoint, &request, timeout)
            .await
            .map_err(CoordinatorError::from)?;

        match response {
            RpcResponse::ProcessResult { result, .. } => {
                if !result.success {
                    return Err(CoordinatorError::BackendError {
                        message: result.error.unwrap_or_else(|| "backend reported failure".to_string()),
                    });
                }
                serde_json::from_str(&result.envelope_json).map_err(CoordinatorError::from)
            }
            RpcResponse::Error { error, .. } => Err(CoordinatorError::BackendError { message: error.message }),
            RpcResponse::RouteResult { .. } => Err(CoordinatorError::TransportError {
                message: "backend returned a route_result for a process call".to_string(),
            }),
        }
    }
}
