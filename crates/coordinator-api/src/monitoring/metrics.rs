//! Prometheus metrics for the coordinator (§4.I).
//!
//! Grounded on the teacher's `monitoring::metrics` lazy_static registry
//! pattern, narrowed to the coordinator's own metric set under a single
//! `coordinator` namespace instead of the teacher's multi-subsystem sprawl.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

const RANK_BUCKETS: &[f64] = &[1.0, 2.0, 3.0, 4.0, 5.0, 10.0];

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref SUCCESSFUL_RANK: Histogram = Histogram::with_opts(
        HistogramOpts::new("successful_rank", "Rank of the first candidate that produced a good response")
            .namespace("coordinator")
            .buckets(RANK_BUCKETS.to_vec())
    ).unwrap();

    pub static ref ATTEMPTS_BEFORE_SUCCESS: Histogram = Histogram::with_opts(
        HistogramOpts::new("attempts_before_success", "Number of cascade attempts performed before a good response")
            .namespace("coordinator")
            .buckets(RANK_BUCKETS.to_vec())
    ).unwrap();

    pub static ref PRIMARY_SUCCESS_TOTAL: Counter = Counter::with_opts(
        Opts::new("primary_success_total", "Count of dispatches where the first candidate (rank 1) succeeded")
            .namespace("coordinator")
    ).unwrap();

    pub static ref FALLBACK_USED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("fallback_used_total", "Count of dispatches where a non-primary candidate succeeded")
            .namespace("coordinator"),
        &["rank"]
    ).unwrap();

    pub static ref REGISTERED_SERVICES: Gauge = Gauge::with_opts(
        Opts::new("registered_services", "Current number of registered services, any status")
            .namespace("coordinator")
    ).unwrap();

    pub static ref REGISTRATION_REQUESTS_TOTAL: Counter = Counter::with_opts(
        Opts::new("registration_requests_total", "Total service registration requests received")
            .namespace("coordinator")
    ).unwrap();

    pub static ref REGISTRATION_FAILURES_TOTAL: Counter = Counter::with_opts(
        Opts::new("registration_failures_total", "Total service registration requests rejected")
            .namespace("coordinator")
    ).unwrap();

    pub static ref ROUTING_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("routing_requests_total", "Total routing requests, labeled by ranking method and outcome status")
            .namespace("coordinator"),
        &["method", "status"]
    ).unwrap();

    pub static ref ROUTING_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("routing_duration_seconds", "End-to-end routing request duration in seconds")
            .namespace("coordinator")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method"]
    ).unwrap();
}

/// Registers every collector exactly once. Call from process startup before
/// the first `/metrics` scrape.
pub fn init() {
    let _ = REGISTRY.register(Box::new(SUCCESSFUL_RANK.clone()));
    let _ = REGISTRY.register(Box::new(ATTEMPTS_BEFORE_SUCCESS.clone()));
    let _ = REGISTRY.register(Box::new(PRIMARY_SUCCESS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FALLBACK_USED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REGISTERED_SERVICES.clone()));
    let _ = REGISTRY.register(Box::new(REGISTRATION_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REGISTRATION_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ROUTING_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ROUTING_DURATION_SECONDS.clone()));
}

/// Records a completed cascade's rank-related counters per §4.F.
pub fn record_dispatch_outcome(rank: Option<usize>, attempts_performed: usize) {
    ATTEMPTS_BEFORE_SUCCESS.observe(attempts_performed as f64);
    if let Some(rank) = rank {
        SUCCESSFUL_RANK.observe(rank as f64);
        if rank == 1 {
            PRIMARY_SUCCESS_TOTAL.inc();
        } else {
            FALLBACK_USED_TOTAL.with_label_values(&[&rank.to_string()]).inc();
        }
    }
}

/// Renders the current snapshot as Prometheus text exposition format.
pub fn render() -> Result<String, coordinator_core::CoordinatorError> {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .map_err(coordinator_core::CoordinatorError::from)?;
    String::from_utf8(buffer).map_err(|e| coordinator_core::CoordinatorError::SerializationError {
        message: format!("metrics buffer was not utf-8: {e}"),
    })
}
