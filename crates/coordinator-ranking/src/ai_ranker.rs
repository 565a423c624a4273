//! LLM-driven candidate ranking with a strict JSON response contract.
//!
//! Treats the LLM as an adversarial input source (per the design notes this
//! crate implements): non-JSON responses, unknown service names, and
//! out-of-range confidences are all rejected rather than trusted.

use coordinator_core::config::AiRankerConfig;
use coordinator_core::{Candidate, CoordinatorError, ServiceRecord};
use serde::Deserialize;

use crate::provider::RankingProvider;

const SYNTHETIC_START: f64 = 0.30;
const SYNTHETIC_STEP: f64 = 0.01;

#[derive(Debug, Deserialize)]
struct RankResponse {
    #[serde(rename = "targetServices")]
    target_services: Vec<RankedTarget>,
    #[allow(dead_code)]
    #[serde(default)]
    strategy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RankedTarget {
    #[serde(rename = "serviceName")]
    service_name: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

pub struct AiRanker {
    provider: Box<dyn RankingProvider>,
    config: AiRankerConfig,
}

impl AiRanker {
    pub fn new(provider: Box<dyn RankingProvider>, config: AiRankerConfig) -> Self {
        Self { provider, config }
    }

    pub async fn rank(&self, query: &str, snapshot: &[ServiceRecord]) -> Result<Vec<Candidate>, CoordinatorError> {
        let prompt = build_prompt(query, snapshot);

        let raw = tokio::time::timeout(self.config.request_timeout, self.provider.complete(&prompt))
            .await
            .map_err(|_| CoordinatorError::AiUnavailable {
                message: "ranking provider timed out".to_string(),
            })??;

        let parsed = parse_strict_json(&raw)?;

        let mut candidates: Vec<Candidate> = parsed
            .target_services
            .into_iter()
            .filter_map(|target| {
                let record = snapshot.iter().find(|r| r.name == target.service_name)?;
                let confidence = target.confidence.clamp(0.0, 1.0);
                Some(Candidate {
                    service_name: record.name.clone(),
                    endpoint: record.endpoint.clone(),
                    confidence,
                    reason: target.reasoning,
                })
            })
            .filter(|c| c.confidence >= self.config.min_confidence)
            .collect();

        candidates.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(self.config.max_candidates);

        if candidates.is_empty() {
            return Ok(synthetic_candidates(snapshot, self.config.max_candidates));
        }

        Ok(candidates)
    }
}

fn build_prompt(query: &str, snapshot: &[ServiceRecord]) -> String {
    let services: Vec<String> = snapshot
        .iter()
        .map(|r| {
            format!(
                "- name: {}, endpoint: {}, capabilities: {:?}",
                r.name, r.endpoint, r.metadata.capabilities
            )
        })
        .collect();

    format!(
        "You are ranking candidate backend services for a request.\n\
         Request query: {query}\n\
         Candidate services:\n{}\n\n\
         Respond with strict JSON only, no prose, no code fences, matching exactly:\n\
         {{ \"targetServices\": [ {{ \"serviceName\": string, \"confidence\": number, \"reasoning\": string }} ], \"strategy\": string }}",
        services.join("\n")
    )
}

fn parse_strict_json(raw: &str) -> Result<RankResponse, CoordinatorError> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let stripped = stripped.strip_suffix("```").unwrap_or(stripped).trim();

    serde_json::from_str(stripped).map_err(|e| CoordinatorError::AiUnavailable {
        message: format!("ranking response was not valid JSON: {e}"),
    })
}

fn synthetic_candidates(snapshot: &[ServiceRecord], max: usize) -> Vec<Candidate> {
    snapshot
        .iter()
        .take(max)
        .enumerate()
        .map(|(i, record)| Candidate {
            service_name: record.name.clone(),
            endpoint: record.endpoint.clone(),
            confidence: (SYNTHETIC_START - i as f64 * SYNTHETIC_STEP).max(0.0),
            reason: "AI ranking produced no usable candidates; synthetic fallback ordering".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_core::registry::{ServiceMetadata, ServiceStatus};
    use std::time::Duration;

    struct StubProvider(String);

    #[async_trait::async_trait]
    impl RankingProvider for StubProvider {
        async fn complete(&self, _prompt: &str) -> Result<String, CoordinatorError> {
            Ok(self.0.clone())
        }
    }

    fn record(name: &str) -> ServiceRecord {
        let mut r = ServiceRecord::new(
            format!("id-{name}"),
            name.to_string(),
            "1.0.0".into(),
            format!("http://{name}:8080"),
            "/health".into(),
            ServiceMetadata::default(),
            false,
        );
        r.status = ServiceStatus::Active;
        r
    }

    fn config() -> AiRankerConfig {
        AiRankerConfig {
            request_timeout: Duration::from_secs(1),
            ..AiRankerConfig::default()
        }
    }

    #[tokio::test]
    async fn parses_strict_json_response() {
        let snapshot = vec![record("payments")];
        let raw = r#"{"targetServices":[{"serviceName":"payments","confidence":0.9,"reasoning":"matches"}],"strategy":"single"}"#;
        let ranker = AiRanker::new(Box::new(StubProvider(raw.to_string())), config());
        let candidates = ranker.rank("pay for order", &snapshot).await.unwrap();
        assert_eq!(candidates[0].service_name, "payments");
        assert_eq!(candidates[0].confidence, 0.9);
    }

    #[tokio::test]
    async fn strips_code_fences() {
        let snapshot = vec![record("payments")];
        let raw = "```json\n{\"targetServices\":[{\"serviceName\":\"payments\",\"confidence\":0.5,\"reasoning\":\"ok\"}]}\n```";
        let ranker = AiRanker::new(Box::new(StubProvider(raw.to_string())), config());
        let candidates = ranker.rank("q", &snapshot).await.unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn unknown_service_names_are_discarded() {
        let snapshot = vec![record("payments")];
        let raw = r#"{"targetServices":[{"serviceName":"ghost","confidence":0.9,"reasoning":"x"}]}"#;
        let ranker = AiRanker::new(Box::new(StubProvider(raw.to_string())), config());
        let candidates = ranker.rank("q", &snapshot).await.unwrap();
        // falls back to synthetic since nothing survived
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].reason.contains("synthetic"));
    }

    #[tokio::test]
    async fn non_json_response_is_ai_unavailable() {
        let snapshot = vec![record("payments")];
        let ranker = AiRanker::new(Box::new(StubProvider("not json at all".to_string())), config());
        let err = ranker.rank("q", &snapshot).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::AiUnavailable { .. }));
    }

    #[tokio::test]
    async fn confidence_is_clamped_and_filtered() {
        let snapshot = vec![record("a"), record("b")];
        let raw = r#"{"targetServices":[{"serviceName":"a","confidence":1.5,"reasoning":"x"},{"serviceName":"b","confidence":0.01,"reasoning":"y"}]}"#;
        let mut cfg = config();
        cfg.min_confidence = 0.3;
        let ranker = AiRanker::new(Box::new(StubProvider(raw.to_string())), cfg);
        let candidates = ranker.rank("q", &snapshot).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].service_name, "a");
        assert_eq!(candidates[0].confidence, 1.0);
    }
}
