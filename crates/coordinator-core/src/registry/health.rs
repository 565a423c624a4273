//! Background health-sweep task.
//!
//! Disabled by default (`HEALTH_SWEEP_ENABLED=false`) so the deterministic
//! test suite never depends on wall-clock timing. Grounded on the teacher's
//! `bootstrap::health` periodic-check-plus-threshold pattern, generalized
//! from a 4-state `HealthStatus` down to this registry's 3-state lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{ListFilter, Registry};

#[derive(Debug, Clone)]
pub struct HealthSweepConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub failure_threshold: u32,
    pub request_timeout: Duration,
}

impl Default for HealthSweepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(30),
            failure_threshold: 3,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Spawns the sweep as a background task if enabled. Returns `None` when
/// disabled, so callers don't hold a `JoinHandle` to nothing.
pub fn spawn_health_sweep(
    registry: Arc<dyn Registry>,
    config: HealthSweepConfig,
) -> Option<tokio::task::JoinHandle<()>> {
    if !config.enabled {
        info!("health sweep disabled");
        return None;
    }

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .expect("reqwest client build is infallible for default settings");

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.interval);
        // Track consecutive failures per service id locally; the registry
        // record itself does not need to expose this counter to callers.
        let mut failures: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

        loop {
            interval.tick().await;
            let active = registry.list(ListFilter { only_active: true, by_name: None }).await;
            for record in active {
                let url = format!("{}{}", record.endpoint.trim_end_matches('/'), record.health_path);
                let healthy = match client.get(&url).send().await {
                    Ok(resp) => resp.status().is_success(),
                    Err(e) => {
                        debug!(service = %record.name, error = %e, "health check request failed");
                        false
                    }
                };

                let count = failures.entry(record.id.clone()).or_insert(0);
                if healthy {
                    *count = 0;
                } else {
                    *count += 1;
                    if *count >= config.failure_threshold {
                        warn!(
                            service = %record.name,
                            failures = *count,
                            "marking service inactive after consecutive health failures"
                        );
                        if let Err(e) = registry.mark_inactive(&record.id).await {
                            warn!(service = %record.name, error = %e, "failed to mark service inactive");
                        }
                        failures.remove(&record.id);
                    }
                }
            }
        }
    }))
}
