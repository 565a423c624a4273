//! The [`ServiceRecord`] type and its two-stage lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stage of a registered service's lifecycle. Only `Active` records are
/// considered for routing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    PendingMigration,
    Active,
    Inactive,
}

/// Arbitrary service-declared capability/event/endpoint metadata used by the
/// keyword index and surfaced to the AI ranker's prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceMetadata {
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// One API endpoint described in a service's manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEndpoint {
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The service's self-described API/event/schema document, uploaded at stage 2.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub endpoints: Vec<ManifestEndpoint>,
    #[serde(default)]
    pub events_published: Vec<String>,
    #[serde(default)]
    pub events_subscribed: Vec<String>,
    #[serde(default)]
    pub database_tables: Vec<String>,
    #[serde(default)]
    pub request_schema: Option<Value>,
    #[serde(default)]
    pub response_schema: Option<Value>,
}

/// One registered backend service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub version: String,
    pub endpoint: String,
    pub health_path: String,
    pub status: ServiceStatus,
    pub metadata: ServiceMetadata,
    pub manifest: Option<Manifest>,
    pub registered_at: DateTime<Utc>,
    pub last_health_check: Option<DateTime<Utc>>,
    pub supports_rpc: bool,
    #[serde(skip)]
    pub(crate) consecutive_health_failures: u32,
}

impl ServiceRecord {
    pub fn new(
        id: String,
        name: String,
        version: String,
        endpoint: String,
        health_path: String,
        metadata: ServiceMetadata,
        supports_rpc: bool,
    ) -> Self {
        Self {
            id,
            name,
            version,
            endpoint,
            health_path,
            status: ServiceStatus::PendingMigration,
            metadata,
            manifest: None,
            registered_at: Utc::now(),
            last_health_check: None,
            supports_rpc,
            consecutive_health_failures: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ServiceStatus::Active
    }
}

/// Extra capability/event/path tokens a manifest contributes, used by
/// [`crate::keyword_index::KeywordIndex`] without that module needing to know
/// the manifest's internal shape.
pub fn manifest_tokens(manifest: &Manifest) -> Vec<String> {
    let mut tokens = Vec::new();
    for endpoint in &manifest.endpoints {
        tokens.extend(
            endpoint
                .path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase()),
        );
        if let Some(desc) = &endpoint.description {
            tokens.extend(desc.split_whitespace().map(|w| w.to_lowercase()));
        }
    }
    tokens.extend(manifest.events_published.iter().map(|e| e.to_lowercase()));
    tokens.extend(manifest.events_subscribed.iter().map(|e| e.to_lowercase()));
    tokens
}
