//! Shared application state handed to every inbound surface (HTTP and RPC).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use coordinator_core::changelog::{ChangeEventType, Changelog};
use coordinator_core::config::CoordinatorConfig;
use coordinator_core::dispatch::{Candidate, DispatchPolicy};
use coordinator_core::registry::Registry;
use coordinator_core::{CoordinatorError, Envelope, ServiceRecord};

use crate::dispatcher::Dispatcher;
use crate::routing_engine::RoutingEngine;

pub struct AppState {
    pub config: CoordinatorConfig,
    pub registry: Arc<dyn Registry>,
    pub routing_engine: RoutingEngine,
    pub dispatcher: Dispatcher,
    pub changelog: Arc<Changelog>,
    pub started_at: Instant,
}

/// Result of running a full inbound request (routing + cascade) through the
/// shared pipeline — used to render both the HTTP and RPC response bodies.
pub struct RouteOutcome {
    pub method: &'static str,
    pub candidates: Vec<Candidate>,
    pub cascade: coordinator_core::dispatch::CascadeResult,
}

impl AppState {
    /// Runs the full routing + dispatch pipeline for one request. Shared by
    /// the HTTP `/route` handler and the RPC `Route` method so both surfaces
    /// implement identical semantics (§4.H).
    pub async fn handle_route(&self, envelope: &Envelope, policy_override: Option<DispatchPolicy>) -> Result<RouteOutcome, CoordinatorError> {
        let routing = self.routing_engine.route(&envelope.payload.query, envelope.payload.metadata.get("type").map(|s| s.as_str())).await?;

        self.changelog
            .append(
                ChangeEventType::RoutingDecision,
                format!("method={} candidates={}", routing.method, routing.candidates.len()),
                envelope.source.clone(),
            )
            .await;

        let records_by_name: HashMap<String, ServiceRecord> = routing
            .snapshot
            .iter()
            .map(|r| (r.name.clone(), r.clone()))
            .collect();

        let policy = policy_override.unwrap_or_else(|| DispatchPolicy {
            max_attempts: self.config.cascade.max_attempts,
            per_attempt_timeout_ms: self.config.cascade.attempt_timeout.as_millis() as u64,
            min_quality_score: self.config.cascade.min_quality,
            stop_on_first: self.config.cascade.stop_on_first,
            ..DispatchPolicy::default()
        });

        let deadline = Instant::now() + self.config.inbound_default_deadline.min(Duration::from_secs(3600));

        let cascade = self
            .dispatcher
            .dispatch(envelope, &routing.candidates, &policy, &records_by_name, deadline)
            .await;

        let rank = cascade.chosen.as_ref().and_then(|chosen| {
            cascade
                .attempts
                .iter()
                .find(|a| a.service_name == chosen.candidate.service_name && a.success)
                .map(|a| a.rank)
        });
        crate::monitoring::metrics::record_dispatch_outcome(rank, cascade.attempts.len());

        self.changelog
            .append(
                ChangeEventType::DispatchOutcome,
                format!("stop_reason={:?} attempts={}", cascade.stop_reason, cascade.attempts.len()),
                envelope.source.clone(),
            )
            .await;

        Ok(RouteOutcome {
            method: routing.method,
            candidates: routing.candidates,
            cascade,
        })
    }
}
