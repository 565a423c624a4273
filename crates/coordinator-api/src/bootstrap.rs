//! Wires [`CoordinatorConfig`] into a running [`AppState`]: constructs the
//! registry, ranking providers, protocol clients, and dispatcher, and starts
//! the background health sweep. Grounded on the teacher's
//! `bootstrap::manager::ServiceContainer` dependency-wiring shape, narrowed to
//! this system's much smaller dependency graph.

use std::sync::Arc;

use coordinator_core::changelog::Changelog;
use coordinator_core::config::CoordinatorConfig;
use coordinator_core::registry::{spawn_health_sweep, HealthSweepConfig, InMemoryRegistry, Registry};
use coordinator_ranking::{provider_for, AiRanker};
use coordinator_rpc::RpcConnectionPool;

use crate::dispatcher::Dispatcher;
use crate::protocol_clients::{ProtocolClient, ProtocolClients};
use crate::routing_engine::RoutingEngine;
use crate::state::AppState;

pub struct Bootstrapped {
    pub state: Arc<AppState>,
    pub rpc_pool: Arc<RpcConnectionPool>,
    pub health_sweep_handle: Option<tokio::task::JoinHandle<()>>,
}

pub fn bootstrap(config: CoordinatorConfig) -> Bootstrapped {
    crate::monitoring::metrics::init();

    let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());

    let health_sweep_handle = spawn_health_sweep(
        registry.clone(),
        HealthSweepConfig {
            enabled: config.health_sweep.enabled,
            interval: config.health_sweep.interval,
            failure_threshold: config.health_sweep.failure_threshold,
            ..HealthSweepConfig::default()
        },
    );

    let ai_ranker = if config.ai.enabled {
        config.ai.provider_key.as_deref().map(|key| {
            let provider = provider_for(&config.ai.model, key, config.ai.temperature);
            AiRanker::new(provider, config.ai.clone())
        })
    } else {
        None
    };

    let routing_engine = RoutingEngine::new(registry.clone(), ai_ranker, config.ai.clone());

    let rpc_pool = Arc::new(RpcConnectionPool::new());
    let protocol_clients: Arc<dyn ProtocolClient> = Arc::new(ProtocolClients::new(rpc_pool.clone()));
    let dispatcher = Dispatcher::new(protocol_clients);

    let changelog = Arc::new(Changelog::new(config.changelog_max_entries));

    let state = Arc::new(AppState {
        config,
        registry,
        routing_engine,
        dispatcher,
        changelog,
        started_at: std::time::Instant::now(),
    });

    Bootstrapped {
        state,
        rpc_pool,
        health_sweep_handle,
    }
}
