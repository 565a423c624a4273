//! HTTP routes (§6): registration lifecycle, routing, service listing,
//! health, metrics, and the admin reset endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{delete, get, post, web, HttpResponse};
use coordinator_core::dispatch::DispatchPolicy;
use coordinator_core::registry::{ListFilter, Manifest, ServiceMetadata};
use coordinator_core::{CoordinatorError, Envelope, ErrorBody};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register_service)
        .service(complete_migration)
        .service(route_request)
        .service(list_services)
        .service(health)
        .service(metrics)
        .service(reset_registry);
}

fn error_response(err: CoordinatorError) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(err.http_status()).unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ErrorBody::from(&err))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    version: String,
    endpoint: String,
    #[serde(default, rename = "healthPath")]
    health_path: String,
    #[serde(default)]
    metadata: Option<RegisterMetadata>,
    #[serde(default, rename = "supportsRpc")]
    supports_rpc: bool,
}

#[derive(Debug, Deserialize)]
struct RegisterMetadata {
    #[serde(default)]
    capabilities: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    id: String,
    status: &'static str,
}

#[post("/register")]
async fn register_service(state: web::Data<Arc<AppState>>, body: web::Json<RegisterRequest>) -> HttpResponse {
    crate::monitoring::metrics::REGISTRATION_REQUESTS_TOTAL.inc();

    let body = body.into_inner();
    let metadata = ServiceMetadata {
        capabilities: body.metadata.map(|m| m.capabilities).unwrap_or_default(),
    };

    match state
        .registry
        .register(body.name, body.version, body.endpoint, body.health_path, metadata, body.supports_rpc)
        .await
    {
        Ok(id) => {
            state
                .changelog
                .append(
                    coordinator_core::changelog::ChangeEventType::ServiceRegistered,
                    format!("id={id}"),
                    "http".to_string(),
                )
                .await;
            crate::monitoring::metrics::REGISTERED_SERVICES.inc();
            HttpResponse::Created().json(RegisterResponse {
                id,
                status: "pending_migration",
            })
        }
        Err(err) => {
            crate::monitoring::metrics::REGISTRATION_FAILURES_TOTAL.inc();
            error_response(err)
        }
    }
}

#[derive(Debug, Deserialize)]
struct MigrationRequest {
    manifest: Manifest,
}

#[derive(Debug, Serialize)]
struct MigrationResponse {
    id: String,
    status: &'static str,
}

#[post("/register/{id}/migration")]
async fn complete_migration(state: web::Data<Arc<AppState>>, path: web::Path<String>, body: web::Json<MigrationRequest>) -> HttpResponse {
    let id = path.into_inner();
    match state.registry.complete_migration(&id, body.into_inner().manifest).await {
        Ok(record) => {
            state
                .changelog
                .append(
                    coordinator_core::changelog::ChangeEventType::ServiceActivated,
                    format!("id={id}"),
                    "http".to_string(),
                )
                .await;
            HttpResponse::Ok().json(MigrationResponse {
                id: record.id,
                status: "active",
            })
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct RoutingOverride {
    #[serde(default, rename = "maxAttempts")]
    max_attempts: Option<usize>,
    #[serde(default, rename = "minQualityScore")]
    min_quality_score: Option<f64>,
    #[serde(default, rename = "stopOnFirst")]
    stop_on_first: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RouteRequestBody {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
    #[serde(default)]
    context: Option<HashMap<String, String>>,
    #[serde(default)]
    routing: Option<RoutingOverride>,
}

#[derive(Debug, Serialize)]
struct RoutingSummary {
    method: &'static str,
    candidates: Vec<coordinator_core::dispatch::Candidate>,
    #[serde(rename = "processingMs")]
    processing_ms: u64,
}

#[derive(Debug, Serialize)]
struct DispatchSummary {
    chosen: Option<serde_json::Value>,
    attempts: Vec<coordinator_core::dispatch::AttemptRecord>,
    #[serde(rename = "stopReason")]
    stop_reason: coordinator_core::dispatch::StopReason,
}

#[derive(Debug, Serialize)]
struct RouteResponseBody {
    success: bool,
    routing: RoutingSummary,
    dispatch: DispatchSummary,
}

#[post("/route")]
async fn route_request(state: web::Data<Arc<AppState>>, body: web::Json<RouteRequestBody>) -> HttpResponse {
    let started = std::time::Instant::now();
    let body = body.into_inner();

    let mut metadata = HashMap::new();
    if let Some(payload) = &body.payload {
        metadata.insert("payload_json".to_string(), payload.to_string());
    }

    let envelope = Envelope::build(
        "http",
        "unspecified",
        "unspecified",
        body.query.unwrap_or_default(),
        metadata,
        body.context.unwrap_or_default(),
        None,
    );

    let policy_override = body.routing.map(|r| DispatchPolicy {
        max_attempts: r.max_attempts.unwrap_or_else(|| DispatchPolicy::default().max_attempts),
        min_quality_score: r.min_quality_score.unwrap_or_else(|| DispatchPolicy::default().min_quality_score),
        stop_on_first: r.stop_on_first.unwrap_or_else(|| DispatchPolicy::default().stop_on_first),
        ..DispatchPolicy::default()
    });

    match state.handle_route(&envelope, policy_override).await {
        Ok(outcome) => {
            let status = if outcome.cascade.chosen.is_some() { "success" } else { "no_good_response" };
            crate::monitoring::metrics::ROUTING_REQUESTS_TOTAL
                .with_label_values(&[outcome.method, status])
                .inc();
            crate::monitoring::metrics::ROUTING_DURATION_SECONDS
                .with_label_values(&[outcome.method])
                .observe(started.elapsed().as_secs_f64());

            HttpResponse::Ok().json(RouteResponseBody {
                success: outcome.cascade.chosen.is_some(),
                routing: RoutingSummary {
                    method: outcome.method,
                    candidates: outcome.candidates,
                    processing_ms: started.elapsed().as_millis() as u64,
                },
                dispatch: DispatchSummary {
                    chosen: outcome.cascade.chosen.map(|c| c.payload),
                    attempts: outcome.cascade.attempts,
                    stop_reason: outcome.cascade.stop_reason,
                },
            })
        }
        Err(err) => {
            crate::monitoring::metrics::ROUTING_REQUESTS_TOTAL
                .with_label_values(&["none", "error"])
                .inc();
            error_response(err)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default, rename = "includeAll")]
    include_all: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ServiceView {
    name: String,
    version: String,
    endpoint: String,
    status: coordinator_core::registry::ServiceStatus,
    #[serde(rename = "registeredAt")]
    registered_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
struct ServicesResponse {
    services: Vec<ServiceView>,
}

#[get("/services")]
async fn list_services(state: web::Data<Arc<AppState>>, query: web::Query<ListQuery>) -> HttpResponse {
    let only_active = !query.include_all.unwrap_or(false);
    let records = state.registry.list(ListFilter { only_active, by_name: None }).await;
    let services = records
        .into_iter()
        .map(|r| ServiceView {
            name: r.name,
            version: r.version,
            endpoint: r.endpoint,
            status: r.status,
            registered_at: r.registered_at,
        })
        .collect();
    HttpResponse::Ok().json(ServicesResponse { services })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime: u64,
    #[serde(rename = "registeredServices")]
    registered_services: usize,
}

#[get("/health")]
async fn health(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let records = state.registry.list(ListFilter::default()).await;
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        uptime: state.started_at.elapsed().as_secs(),
        registered_services: records.len(),
    })
}

#[get("/metrics")]
async fn metrics() -> HttpResponse {
    match crate::monitoring::metrics::render() {
        Ok(text) => HttpResponse::Ok().content_type("text/plain; version=0.0.4").body(text),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    deleted: usize,
}

#[delete("/register/services")]
async fn reset_registry(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let deleted = state.registry.delete_all().await;
    HttpResponse::Ok().json(DeleteResponse { deleted })
}
