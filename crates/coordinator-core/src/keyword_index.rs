//! Deterministic, local-only candidate ranker. Used as the AI ranker's
//! fallback and as the sole ranker when AI is disabled.
//!
//! Grounded on the teacher's `select_relevant_tools` keyword-containment
//! matching in `workflow-engine-core::nodes::agent` (tokenizing a prompt and a
//! tool's name/description, then matching word sets), generalized here to
//! score a query against a whole service record instead of a single tool.

use std::collections::HashSet;

use crate::dispatch::Candidate;
use crate::registry::ServiceRecord;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "to", "for", "in", "on", "and", "or", "is", "are", "with", "by",
];

const MAX_CANDIDATES: usize = 10;
const NAME_MATCH_WEIGHT: f64 = 0.8;
const CAPABILITY_WEIGHT: f64 = 0.6;
const ENDPOINT_SEGMENT_WEIGHT: f64 = 0.4;
const EVENT_WEIGHT: f64 = 0.5;
const TYPE_FIELD_WEIGHT: f64 = 0.7;
const SYNTHETIC_START: f64 = 0.30;
const SYNTHETIC_STEP: f64 = 0.01;

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn service_name_tokens(name: &str) -> HashSet<String> {
    name.split(|c: char| c == '-' || c == '_')
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

pub struct KeywordIndex;

impl KeywordIndex {
    /// Scores `query` (plus an optional `type_hint` drawn from
    /// `payload.type`/`payload.metadata["type"]`) against every record in
    /// `snapshot`, returning candidates sorted by confidence descending, tied
    /// broken by registration order.
    pub fn score(query: &str, type_hint: Option<&str>, snapshot: &[ServiceRecord]) -> Vec<Candidate> {
        let query_tokens = tokenize(query);

        let mut scored: Vec<(f64, &ServiceRecord)> = snapshot
            .iter()
            .map(|record| (Self::score_one(&query_tokens, type_hint, record), record))
            .collect();

        if scored.iter().all(|(score, _)| *score <= 0.0) {
            // No record scored above zero: synthesize a descending ladder
            // so the dispatcher still has something to try, in registration
            // order (already the snapshot's order).
            return snapshot
                .iter()
                .take(MAX_CANDIDATES)
                .enumerate()
                .map(|(i, record)| Candidate {
                    service_name: record.name.clone(),
                    endpoint: record.endpoint.clone(),
                    confidence: (SYNTHETIC_START - i as f64 * SYNTHETIC_STEP).max(0.0),
                    reason: "no keyword match; synthetic fallback ordering".to_string(),
                })
                .collect();
        }

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.registered_at.cmp(&b.registered_at))
        });

        scored
            .into_iter()
            .filter(|(score, _)| *score > 0.0)
            .take(MAX_CANDIDATES)
            .map(|(score, record)| Candidate {
                service_name: record.name.clone(),
                endpoint: record.endpoint.clone(),
                confidence: score.min(1.0),
                reason: "keyword match".to_string(),
            })
            .collect()
    }

    fn score_one(query_tokens: &HashSet<String>, type_hint: Option<&str>, record: &ServiceRecord) -> f64 {
        let mut score = 0.0f64;

        let name_tokens = service_name_tokens(&record.name);
        if query_tokens.contains(&record.name.to_lowercase())
            || name_tokens.iter().any(|t| query_tokens.contains(t))
        {
            score += NAME_MATCH_WEIGHT;
        }

        let matched_capabilities: HashSet<&String> = record
            .metadata
            .capabilities
            .iter()
            .filter(|cap| query_tokens.contains(&cap.to_lowercase()))
            .collect();
        score += matched_capabilities.len() as f64 * CAPABILITY_WEIGHT;

        if let Some(manifest) = &record.manifest {
            let tokens: HashSet<String> = crate::registry::record::manifest_tokens(manifest)
                .into_iter()
                .collect();
            let matched_segments = tokens.iter().filter(|t| query_tokens.contains(*t)).count();
            score += matched_segments as f64 * ENDPOINT_SEGMENT_WEIGHT;

            let matched_events = manifest
                .events_published
                .iter()
                .chain(manifest.events_subscribed.iter())
                .filter(|e| query_tokens.contains(&e.to_lowercase()))
                .count();
            score += matched_events as f64 * EVENT_WEIGHT;
        }

        if let Some(hint) = type_hint {
            if hint.to_lowercase() == record.name.to_lowercase() {
                score += TYPE_FIELD_WEIGHT;
            }
        }

        score.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Manifest, ManifestEndpoint, ServiceMetadata, ServiceRecord, ServiceStatus};

    fn active_record(name: &str, caps: &[&str]) -> ServiceRecord {
        let mut r = ServiceRecord::new(
            format!("id-{name}"),
            name.to_string(),
            "1.0.0".into(),
            format!("http://{name}:8080"),
            "/health".into(),
            ServiceMetadata { capabilities: caps.iter().map(|s| s.to_string()).collect() },
            false,
        );
        r.status = ServiceStatus::Active;
        r.manifest = Some(Manifest {
            endpoints: vec![ManifestEndpoint { path: format!("/api/{name}"), method: "POST".into(), description: None }],
            ..Default::default()
        });
        r
    }

    #[test]
    fn exact_capability_match_scores_highest() {
        let users = active_record("users", &["users", "profile"]);
        let payments = active_record("payments", &["payments", "billing"]);
        let result = KeywordIndex::score("get user profile", None, &[payments, users]);
        assert_eq!(result[0].service_name, "users");
    }

    #[test]
    fn no_match_falls_back_to_synthetic_ladder() {
        let a = active_record("alpha", &[]);
        let b = active_record("beta", &[]);
        let result = KeywordIndex::score("zzz totally unrelated zzz", None, &[a, b]);
        assert_eq!(result.len(), 2);
        assert!(result[0].confidence > result[1].confidence);
        assert!(result[0].confidence <= 0.30);
    }

    #[test]
    fn caps_at_ten_candidates() {
        let records: Vec<ServiceRecord> = (0..15)
            .map(|i| active_record(&format!("svc{i}"), &["shared"]))
            .collect();
        let result = KeywordIndex::score("shared", None, &records);
        assert_eq!(result.len(), 10);
    }

    #[test]
    fn score_is_clamped_to_one() {
        let mut r = active_record("payments", &["payments", "billing", "invoices"]);
        r.manifest = Some(Manifest {
            endpoints: vec![ManifestEndpoint { path: "/api/payments/billing/invoices".into(), method: "POST".into(), description: None }],
            events_published: vec!["payments".into()],
            ..Default::default()
        });
        let result = KeywordIndex::score("payments billing invoices", Some("payments"), &[r]);
        assert_eq!(result[0].confidence, 1.0);
    }
}
