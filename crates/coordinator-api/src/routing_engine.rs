//! RoutingEngine (§4.E): orchestrates AI-then-keyword-fallback ranking over
//! the registry's active snapshot.

use std::sync::Arc;

use coordinator_core::config::AiRankerConfig;
use coordinator_core::dispatch::Candidate;
use coordinator_core::registry::{ListFilter, Registry};
use coordinator_core::{CoordinatorError, KeywordIndex, ServiceRecord};
use coordinator_ranking::AiRanker;

const MAX_CANDIDATES: usize = 10;

pub struct RoutingResult {
    pub method: &'static str,
    pub candidates: Vec<Candidate>,
    pub snapshot: Vec<ServiceRecord>,
}

pub struct RoutingEngine {
    registry: Arc<dyn Registry>,
    ai_ranker: Option<AiRanker>,
    ai_config: AiRankerConfig,
}

impl RoutingEngine {
    pub fn new(registry: Arc<dyn Registry>, ai_ranker: Option<AiRanker>, ai_config: AiRankerConfig) -> Self {
        Self {
            registry,
            ai_ranker,
            ai_config,
        }
    }

    pub async fn route(&self, query: &str, type_hint: Option<&str>) -> Result<RoutingResult, CoordinatorError> {
        let snapshot = self.registry.list(ListFilter { only_active: true, by_name: None }).await;
        if snapshot.is_empty() {
            return Err(CoordinatorError::NoActiveServices);
        }

        let (method, mut candidates) = if self.ai_config.enabled {
            match &self.ai_ranker {
                Some(ranker) => match ranker.rank(query, &snapshot).await {
                    Ok(candidates) => ("ai", candidates),
                    Err(err) if self.ai_config.fallback_enabled => {
                        tracing::warn!(error = %err, "ai ranker unavailable, falling back to keyword index");
                        ("keyword", KeywordIndex::score(query, type_hint, &snapshot))
                    }
                    Err(err) => return Err(err),
                },
                None => ("keyword", KeywordIndex::score(query, type_hint, &snapshot)),
            }
        } else {
            ("keyword", KeywordIndex::score(query, type_hint, &snapshot))
        };

        candidates.truncate(MAX_CANDIDATES);

        Ok(RoutingResult {
            method,
            candidates,
            snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_core::registry::{InMemoryRegistry, Manifest, ManifestEndpoint};

    fn valid_manifest() -> Manifest {
        Manifest {
            endpoints: vec![ManifestEndpoint {
                path: "/api/process".into(),
                method: "POST".into(),
                description: None,
            }],
            ..Manifest::default()
        }
    }

    #[tokio::test]
    async fn no_active_services_is_an_error() {
        let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
        let engine = RoutingEngine::new(registry, None, AiRankerConfig { enabled: false, ..Default::default() });
        let err = engine.route("hello", None).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NoActiveServices));
    }

    #[tokio::test]
    async fn disabled_ai_uses_keyword_method() {
        let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
        let id = registry
            .register(
                "payments".into(),
                "1.0.0".into(),
                "http://p:4000".into(),
                String::new(),
                Default::default(),
                false,
            )
            .await
            .unwrap();
        registry.complete_migration(&id, valid_manifest()).await.unwrap();

        let engine = RoutingEngine::new(registry, None, AiRankerConfig { enabled: false, ..Default::default() });
        let result = engine.route("payments", None).await.unwrap();
        assert_eq!(result.method, "keyword");
        assert_eq!(result.candidates.len(), 1);
    }
}
