//! Wire messages for the coordinator's internal RPC surface.
//!
//! Two methods: `Route` (used by a caller that prefers the coordinator's
//! ranking decision over binary framing instead of HTTP) and `Process` (used
//! to forward an Envelope to a registered backend that opted into
//! `supportsRpc`). Tagged-enum shape is grounded directly on the teacher's
//! `MCPRequest`/`MCPResponse` protocol enums in `workflow-engine-mcp::protocol`,
//! generalized from tool-call semantics to this system's two methods.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum RpcRequest {
    #[serde(rename = "route")]
    Route { id: String, params: RouteParams },
    #[serde(rename = "process")]
    Process { id: String, params: ProcessParams },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteParams {
    pub tenant_id: String,
    pub user_id: String,
    pub query_text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessParams {
    /// Canonical-JSON encoded `Envelope`, opaque to the transport layer.
    pub envelope_json: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RpcResponse {
    #[serde(rename = "route_result")]
    RouteResult { id: String, result: RouteResult },
    #[serde(rename = "process_result")]
    ProcessResult { id: String, result: ProcessResult },
    #[serde(rename = "error")]
    Error { id: String, error: RpcError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub target_services: Vec<String>,
    #[serde(default)]
    pub normalized_fields: HashMap<String, String>,
    pub envelope_json: String,
    pub routing_metadata_json: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub envelope_json: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
}

impl RpcRequest {
    pub fn id(&self) -> &str {
        match self {
            RpcRequest::Route { id, .. } => id,
            RpcRequest::Process { id, .. } => id,
        }
    }
}

impl RpcResponse {
    pub fn id(&self) -> &str {
        match self {
            RpcResponse::RouteResult { id, .. } => id,
            RpcResponse::ProcessResult { id, .. } => id,
            RpcResponse::Error { id, .. } => id,
        }
    }

    pub fn error(id: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        RpcResponse::Error {
            id: id.into(),
            error: RpcError {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_request_round_trips() {
        let request = RpcRequest::Route {
            id: "req-1".to_string(),
            params: RouteParams {
                tenant_id: "tenant".into(),
                user_id: "user".into(),
                query_text: "process payment".into(),
                metadata: HashMap::new(),
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        let parsed: RpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id(), "req-1");
    }

    #[test]
    fn process_result_serializes_with_tag() {
        let response = RpcResponse::ProcessResult {
            id: "req-2".into(),
            result: ProcessResult { success: true, error: None, envelope_json: "{}".into() },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "process_result");
        assert_eq!(value["id"], "req-2");
    }

    #[test]
    fn error_response_carries_code_and_message() {
        let response = RpcResponse::error("req-3", "NOT_FOUND", "no such service");
        assert_eq!(response.id(), "req-3");
        match response {
            RpcResponse::Error { error, .. } => assert_eq!(error.code, "NOT_FOUND"),
            _ => panic!("expected error variant"),
        }
    }
}
