//! Dispatcher (Cascade) — §4.F. The central engineering piece: tries
//! candidates strictly sequentially, stopping at the first response that
//! passes quality assessment, and records full per-attempt diagnostics
//! either way.
//!
//! Grounded on the non-teacher `claw-router` example's `escalate()` function
//! (try-each-candidate-until-good, collect rejection reasons) generalized
//! here with an explicit policy, a deadline budget, and the teacher's
//! `tokio::time::timeout`-per-attempt idiom.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use coordinator_core::dispatch::{AttemptRecord, Candidate, CascadeResult, ChosenResponse, DispatchPolicy, RejectReason, StopReason};
use coordinator_core::{CoordinatorError, Envelope, ServiceRecord};
use serde_json::Value;

use crate::protocol_clients::ProtocolClient;

const METADATA_ONLY_FIELDS: &[&str] = &["timestamp", "status", "message", "success", "error"];
const CONTAINER_FIELDS: &[&str] = &["results", "items", "data"];

pub struct Dispatcher {
    clients: Arc<dyn ProtocolClient>,
}

impl Dispatcher {
    pub fn new(clients: Arc<dyn ProtocolClient>) -> Self {
        Self { clients }
    }

    /// Runs the cascade over `candidates` (already in rank order) against
    /// `records_by_name` (used only to look up each candidate's `supportsRpc`
    /// flag), honoring `policy` and the caller's overall `deadline`.
    pub async fn dispatch(
        &self,
        envelope: &Envelope,
        candidates: &[Candidate],
        policy: &DispatchPolicy,
        records_by_name: &HashMap<String, ServiceRecord>,
        deadline: Instant,
    ) -> CascadeResult {
        let mut attempts = Vec::new();
        let mut chosen: Option<ChosenResponse> = None;
        let mut stop_reason = StopReason::ExhaustedCandidates;

        let attempt_count = candidates.len().min(policy.max_attempts);

        for (index, candidate) in candidates.iter().take(attempt_count).enumerate() {
            let rank = index + 1;

            if Instant::now() >= deadline {
                stop_reason = StopReason::DeadlineExceeded;
                break;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let attempt_timeout = remaining.min(Duration::from_millis(policy.per_attempt_timeout_ms));

            let supports_rpc = records_by_name
                .get(&candidate.service_name)
                .map(|r| r.supports_rpc)
                .unwrap_or(false);

            let started = Instant::now();
            let outcome = self
                .clients
                .dispatch(&candidate.service_name, &candidate.endpoint, supports_rpc, envelope, attempt_timeout)
                .await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(payload) => {
                    let quality = quality_of(&payload);
                    if is_good(&payload, quality, policy) {
                        attempts.push(AttemptRecord {
                            rank,
                            service_name: candidate.service_name.clone(),
                            confidence: candidate.confidence,
                            success: true,
                            quality,
                            duration_ms,
                            reject_reason: None,
                        });
                        if chosen.is_none() {
                            chosen = Some(ChosenResponse {
                                candidate: candidate.clone(),
                                payload,
                            });
                        }
                        if policy.stop_on_first {
                            stop_reason = StopReason::FoundGoodResponse;
                            break;
                        }
                    } else {
                        attempts.push(AttemptRecord {
                            rank,
                            service_name: candidate.service_name.clone(),
                            confidence: candidate.confidence,
                            success: false,
                            quality,
                            duration_ms,
                            reject_reason: Some(reject_reason_for(&payload, quality, policy)),
                        });
                    }
                }
                Err(err) => {
                    let reject_reason = if matches!(err, CoordinatorError::BackendTimeout { .. }) {
                        RejectReason::Timeout
                    } else {
                        RejectReason::ServiceError
                    };
                    attempts.push(AttemptRecord {
                        rank,
                        service_name: candidate.service_name.clone(),
                        confidence: candidate.confidence,
                        success: false,
                        quality: 0.0,
                        duration_ms,
                        reject_reason: Some(reject_reason),
                    });
                }
            }
        }

        if chosen.is_some() && stop_reason == StopReason::ExhaustedCandidates {
            stop_reason = StopReason::FoundGoodResponse;
        } else if chosen.is_none() && stop_reason == StopReason::ExhaustedCandidates && Instant::now() >= deadline {
            stop_reason = StopReason::DeadlineExceeded;
        }

        CascadeResult {
            chosen,
            attempts,
            stop_reason,
        }
    }
}

/// Single-level `{"data": {...}}` unwrap for quality assessment only; the
/// caller always receives the original, non-unwrapped payload (§4.F).
fn unwrap_for_assessment(payload: &Value) -> &Value {
    if let Value::Object(map) = payload {
        if map.len() == 1 {
            if let Some(data) = map.get("data") {
                if data.is_object() {
                    return data;
                }
            }
        }
    }
    payload
}

fn quality_of(payload: &Value) -> f64 {
    let assessed = unwrap_for_assessment(payload);
    let Value::Object(map) = assessed else {
        return 0.0;
    };
    let k = map.len();
    match k {
        0 => 0.0,
        1..=2 => 0.3,
        3..=9 => 0.7,
        _ => 1.0,
    }
}

fn is_good(payload: &Value, quality: f64, policy: &DispatchPolicy) -> bool {
    let assessed = unwrap_for_assessment(payload);

    let Value::Object(map) = assessed else {
        return false;
    };
    if map.is_empty() {
        return false;
    }

    if matches!(map.get("success"), Some(Value::Bool(false))) {
        return false;
    }

    if policy.reject_empty_collections {
        for field in CONTAINER_FIELDS {
            if let Some(Value::Array(items)) = map.get(*field) {
                if items.is_empty() {
                    return false;
                }
            }
        }
    }

    if policy.require_relevant_fields {
        let has_relevant = map.keys().any(|k| !METADATA_ONLY_FIELDS.contains(&k.as_str()));
        if !has_relevant {
            return false;
        }
    }

    quality >= policy.min_quality_score
}

fn reject_reason_for(payload: &Value, quality: f64, policy: &DispatchPolicy) -> RejectReason {
    let assessed = unwrap_for_assessment(payload);

    if let Value::Array(items) = assessed {
        if items.is_empty() {
            return RejectReason::EmptyData;
        }
    }

    let Value::Object(map) = assessed else {
        return RejectReason::NoData;
    };
    if map.is_empty() {
        return RejectReason::EmptyData;
    }

    if matches!(map.get("success"), Some(Value::Bool(false))) {
        return RejectReason::ServiceError;
    }

    if policy.reject_empty_collections {
        for field in CONTAINER_FIELDS {
            if let Some(Value::Array(items)) = map.get(*field) {
                if items.is_empty() {
                    return RejectReason::EmptyResults;
                }
            }
        }
    }

    if policy.require_relevant_fields {
        let has_relevant = map.keys().any(|k| !METADATA_ONLY_FIELDS.contains(&k.as_str()));
        if !has_relevant {
            return RejectReason::OnlyMetadata;
        }
    }

    if quality < policy.min_quality_score {
        return RejectReason::QualityTooLow;
    }

    RejectReason::ServiceError
}
