//! End-to-end coverage of the registration -> routing -> cascade pipeline,
//! exercised through [`AppState::handle_route`] with a mocked protocol layer
//! so no real network calls happen. Needs the `test-util` feature for the
//! `Mock*` types (run with `cargo test --features test-util`).

#![cfg(feature = "test-util")]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use coordinator_api::dispatcher::Dispatcher;
use coordinator_api::routing_engine::RoutingEngine;
use coordinator_api::{AppState, MockProtocolClient};
use coordinator_core::changelog::Changelog;
use coordinator_core::config::{AiRankerConfig, CascadePolicy, CoordinatorConfig, HealthSweepSettings, LogFormat};
use coordinator_core::registry::{InMemoryRegistry, Manifest, ManifestEndpoint, Registry, ServiceMetadata};
use coordinator_core::{CoordinatorError, Envelope};
use coordinator_ranking::MockRankingProvider;
use serde_json::json;

fn test_config(ai: AiRankerConfig, cascade: CascadePolicy, inbound_default_deadline: Duration) -> CoordinatorConfig {
    CoordinatorConfig {
        http_port: 3000,
        rpc_port: 50051,
        ai,
        cascade,
        registry_store_url: None,
        changelog_max_entries: 100,
        log_format: LogFormat::Pretty,
        rust_log: "info".into(),
        health_sweep: HealthSweepSettings {
            enabled: false,
            ..HealthSweepSettings::default()
        },
        inbound_default_deadline,
    }
}

fn manifest_for(capability: &str) -> Manifest {
    Manifest {
        endpoints: vec![ManifestEndpoint {
            path: format!("/api/{capability}"),
            method: "POST".into(),
            description: None,
        }],
        ..Manifest::default()
    }
}

async fn register_active(registry: &InMemoryRegistry, name: &str, endpoint: &str, capability: &str) -> String {
    let id = registry
        .register(
            name.to_string(),
            "1.0.0".into(),
            endpoint.to_string(),
            String::new(),
            ServiceMetadata {
                capabilities: vec![capability.to_string()],
            },
            false,
        )
        .await
        .unwrap();
    registry.complete_migration(&id, manifest_for(capability)).await.unwrap();
    id
}

fn envelope(query: &str) -> Envelope {
    Envelope::build("http", "tenant-test", "user-test", query, HashMap::new(), HashMap::new(), None)
}

fn app_state(registry: Arc<dyn Registry>, ai_ranker: Option<coordinator_ranking::AiRanker>, config: CoordinatorConfig, clients: MockProtocolClient) -> AppState {
    let routing_engine = RoutingEngine::new(registry.clone(), ai_ranker, config.ai.clone());
    let dispatcher = Dispatcher::new(Arc::new(clients));
    AppState {
        config,
        registry,
        routing_engine,
        dispatcher,
        changelog: Arc::new(Changelog::new(100)),
        started_at: Instant::now(),
    }
}

/// §8 scenario 1: a service that completes registration is routed to by a
/// matching query and its response is returned as the chosen candidate.
#[tokio::test]
async fn registration_then_keyword_routing_happy_path() {
    let inner = InMemoryRegistry::new();
    register_active(&inner, "payments", "http://payments:4000", "payments").await;
    let registry: Arc<dyn Registry> = Arc::new(inner);

    let mut clients = MockProtocolClient::new();
    clients
        .expect_dispatch()
        .withf(|name, _, _, _, _| name == "payments")
        .returning(|_, _, _, _, _| Ok(json!({"results": [1, 2], "status": "ok"})));

    let config = test_config(
        AiRankerConfig { enabled: false, ..AiRankerConfig::default() },
        CascadePolicy::default(),
        Duration::from_secs(5),
    );
    let state = app_state(registry, None, config, clients);

    let outcome = state.handle_route(&envelope("payments please"), None).await.unwrap();
    assert_eq!(outcome.method, "keyword");
    assert!(outcome.cascade.chosen.is_some());
    assert_eq!(outcome.cascade.chosen.unwrap().candidate.service_name, "payments");
}

/// §8 scenario 2: the AI ranker errors out, `fallback_enabled` kicks in, and
/// routing falls back to the deterministic keyword index.
#[tokio::test]
async fn ai_failure_falls_back_to_keyword_routing() {
    let inner = InMemoryRegistry::new();
    register_active(&inner, "payments", "http://payments:4000", "payments").await;
    let registry: Arc<dyn Registry> = Arc::new(inner);

    let mut provider = MockRankingProvider::new();
    provider
        .expect_complete()
        .returning(|_| Err(CoordinatorError::AiUnavailable { message: "provider down".into() }));

    let ai_config = AiRankerConfig {
        enabled: true,
        fallback_enabled: true,
        ..AiRankerConfig::default()
    };
    let ranker = coordinator_ranking::AiRanker::new(Box::new(provider), ai_config.clone());

    let mut clients = MockProtocolClient::new();
    clients
        .expect_dispatch()
        .returning(|_, _, _, _, _| Ok(json!({"results": [1], "status": "ok"})));

    let config = test_config(ai_config, CascadePolicy::default(), Duration::from_secs(5));
    let state = app_state(registry, Some(ranker), config, clients);

    let outcome = state.handle_route(&envelope("payments please"), None).await.unwrap();
    assert_eq!(outcome.method, "keyword");
}

/// §8 scenario 3: the first candidate's response is rejected (metadata-only),
/// the cascade advances to the second candidate, which succeeds.
#[tokio::test]
async fn two_candidate_cascade_advances_past_a_bad_first_response() {
    let inner = InMemoryRegistry::new();
    register_active(&inner, "svc-a", "http://svc-a:4000", "billing").await;
    register_active(&inner, "svc-b", "http://svc-b:4000", "billing").await;
    let registry: Arc<dyn Registry> = Arc::new(inner);

    let mut clients = MockProtocolClient::new();
    clients
        .expect_dispatch()
        .withf(|name, _, _, _, _| name == "svc-a")
        .returning(|_, _, _, _, _| Ok(json!({"status": "ok", "timestamp": "now"})));
    clients
        .expect_dispatch()
        .withf(|name, _, _, _, _| name == "svc-b")
        .returning(|_, _, _, _, _| Ok(json!({"results": [1, 2, 3], "status": "ok"})));

    let config = test_config(
        AiRankerConfig { enabled: false, ..AiRankerConfig::default() },
        CascadePolicy { stop_on_first: false, ..CascadePolicy::default() },
        Duration::from_secs(5),
    );
    let state = app_state(registry, None, config, clients);

    let outcome = state.handle_route(&envelope("billing question"), None).await.unwrap();
    assert_eq!(outcome.cascade.attempts.len(), 2);
    assert!(!outcome.cascade.attempts[0].success);
    assert!(outcome.cascade.attempts[1].success);
    assert_eq!(outcome.cascade.chosen.unwrap().candidate.service_name, "svc-b");
}

/// §8 scenario 4: no services registered at all produces `NoActiveServices`.
#[tokio::test]
async fn no_registered_services_is_an_error() {
    let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
    let clients = MockProtocolClient::new();
    let config = test_config(
        AiRankerConfig { enabled: false, ..AiRankerConfig::default() },
        CascadePolicy::default(),
        Duration::from_secs(5),
    );
    let state = app_state(registry, None, config, clients);

    let err = state.handle_route(&envelope("anything"), None).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::NoActiveServices));
}

/// §8 scenario 5: re-registering a still-active name is a conflict.
#[tokio::test]
async fn duplicate_active_registration_is_rejected() {
    let registry = InMemoryRegistry::new();
    let id = registry
        .register("payments".into(), "1.0.0".into(), "http://payments:4000".into(), String::new(), ServiceMetadata::default(), false)
        .await
        .unwrap();
    registry.complete_migration(&id, manifest_for("payments")).await.unwrap();

    let err = registry
        .register("payments".into(), "1.0.1".into(), "http://payments2:4000".into(), String::new(), ServiceMetadata::default(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::NameConflict { .. }));
}

/// §8 scenario 6: two candidates that each consume their full remaining
/// timeout exhaust the deadline rather than the candidate list, so the
/// cascade must report `deadline_exceeded`, not `exhausted_candidates`.
#[tokio::test]
async fn cascade_reports_deadline_exceeded_when_both_attempts_time_out() {
    let inner = InMemoryRegistry::new();
    register_active(&inner, "svc-a", "http://svc-a:4000", "orders").await;
    register_active(&inner, "svc-b", "http://svc-b:4000", "orders").await;
    let registry: Arc<dyn Registry> = Arc::new(inner);

    let mut clients = MockProtocolClient::new();
    clients
        .expect_dispatch()
        .withf(|name, _, _, _, _| name == "svc-a")
        .returning(|_, _, _, _, timeout| {
            std::thread::sleep(timeout);
            Err(CoordinatorError::BackendTimeout { elapsed_ms: timeout.as_millis() as u64 })
        });
    clients
        .expect_dispatch()
        .withf(|name, _, _, _, _| name == "svc-b")
        .returning(|_, _, _, _, timeout| {
            std::thread::sleep(timeout);
            Err(CoordinatorError::BackendTimeout { elapsed_ms: timeout.as_millis() as u64 })
        });

    let config = test_config(
        AiRankerConfig { enabled: false, ..AiRankerConfig::default() },
        CascadePolicy {
            max_attempts: 5,
            attempt_timeout: Duration::from_millis(100),
            ..CascadePolicy::default()
        },
        Duration::from_millis(150),
    );
    let state = app_state(registry, None, config, clients);

    let outcome = state.handle_route(&envelope("orders status"), None).await.unwrap();
    assert!(outcome.cascade.chosen.is_none());
    assert_eq!(outcome.cascade.stop_reason, coordinator_core::StopReason::DeadlineExceeded);
}
