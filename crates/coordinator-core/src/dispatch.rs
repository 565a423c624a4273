//! Data types shared between the `RoutingEngine` and the `Dispatcher`.
//!
//! The orchestration logic that produces these values lives with the
//! dispatcher implementation (it needs the HTTP/RPC protocol clients); this
//! module only carries the shapes so `CoordinatorError::NoGoodResponse` and
//! the inbound response bodies can refer to them without a dependency cycle.

use serde::{Deserialize, Serialize};

/// A service nominated by a ranker, in rank order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub service_name: String,
    pub endpoint: String,
    pub confidence: f64,
    pub reason: String,
}

/// Why a single dispatch attempt was rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    ServiceError,
    NoData,
    EmptyData,
    EmptyResults,
    OnlyMetadata,
    QualityTooLow,
    Timeout,
}

/// Outcome of one candidate invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub rank: usize,
    pub service_name: String,
    pub confidence: f64,
    pub success: bool,
    pub quality: f64,
    pub duration_ms: u64,
    pub reject_reason: Option<RejectReason>,
}

/// Why the cascade stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FoundGoodResponse,
    ExhaustedCandidates,
    DeadlineExceeded,
}

/// Full result of one cascade dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeResult {
    pub chosen: Option<ChosenResponse>,
    pub attempts: Vec<AttemptRecord>,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChosenResponse {
    pub candidate: Candidate,
    pub payload: serde_json::Value,
}

/// Per-request cascade policy. `routing` overrides on an inbound request
/// populate this from [`CascadePolicy`]'s defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchPolicy {
    pub max_attempts: usize,
    pub per_attempt_timeout_ms: u64,
    pub min_quality_score: f64,
    pub stop_on_first: bool,
    pub require_relevant_fields: bool,
    pub reject_empty_collections: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            per_attempt_timeout_ms: 5_000,
            min_quality_score: 0.3,
            stop_on_first: true,
            require_relevant_fields: true,
            reject_empty_collections: true,
        }
    }
}
