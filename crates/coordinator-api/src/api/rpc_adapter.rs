//! Bridges the RPC `Route` method (§6) onto the same [`AppState::handle_route`]
//! pipeline the HTTP `/route` handler uses, so both surfaces share routing
//! semantics and differ only in wire format.

use std::sync::Arc;

use async_trait::async_trait;
use coordinator_core::{CoordinatorError, Envelope};
use coordinator_rpc::protocol::{RouteParams, RouteResult};
use coordinator_rpc::RouteHandler;
use serde_json::json;

use crate::state::AppState;

pub struct RouteHandlerAdapter {
    state: Arc<AppState>,
}

impl RouteHandlerAdapter {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl RouteHandler for RouteHandlerAdapter {
    async fn handle_route(&self, params: RouteParams) -> Result<RouteResult, CoordinatorError> {
        let envelope = Envelope::build(
            "rpc",
            params.tenant_id,
            params.user_id,
            params.query_text,
            params.metadata.clone(),
            std::collections::HashMap::new(),
            None,
        );

        let envelope_json = String::from_utf8(envelope.to_json()?).map_err(|e| CoordinatorError::TransportError {
            message: format!("envelope bytes were not utf-8: {e}"),
        })?;

        let outcome = self.state.handle_route(&envelope, None).await?;

        let target_services = outcome.candidates.iter().map(|c| c.service_name.clone()).collect();
        let routing_metadata_json = json!({
            "method": outcome.method,
            "stopReason": outcome.cascade.stop_reason,
            "attempts": outcome.cascade.attempts.len(),
        })
        .to_string();

        Ok(RouteResult {
            target_services,
            normalized_fields: params.metadata,
            envelope_json,
            routing_metadata_json,
        })
    }
}
