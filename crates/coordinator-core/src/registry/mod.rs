//! The Registry owns the `ServiceRecord` collection exclusively. Every other
//! component — `KeywordIndex`, `RoutingEngine`, the inbound HTTP/RPC surfaces
//! — only ever sees an immutable snapshot produced by [`Registry::list`].
//!
//! Grounded on the teacher's `bootstrap::registry::ServiceRegistry` (double-
//! indexed map under a lock, mockall-tested via a trait), simplified from a
//! multi-instance-per-name load-balanced registry down to this system's
//! name-unique, three-state lifecycle.

mod health;
pub mod record;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::CoordinatorError;
pub use health::{spawn_health_sweep, HealthSweepConfig};
pub use record::{Manifest, ManifestEndpoint, ServiceMetadata, ServiceRecord, ServiceStatus};

/// Filter applied by [`Registry::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub only_active: bool,
    pub by_name: Option<String>,
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    async fn register(
        &self,
        name: String,
        version: String,
        endpoint: String,
        health_path: String,
        metadata: ServiceMetadata,
        supports_rpc: bool,
    ) -> Result<String, CoordinatorError>;

    async fn complete_migration(
        &self,
        id: &str,
        manifest: Manifest,
    ) -> Result<ServiceRecord, CoordinatorError>;

    async fn list(&self, filter: ListFilter) -> Vec<ServiceRecord>;

    async fn get_by_name(&self, name: &str) -> Option<ServiceRecord>;

    async fn get_by_id(&self, id: &str) -> Option<ServiceRecord>;

    async fn mark_inactive(&self, id: &str) -> Result<(), CoordinatorError>;

    async fn delete_all(&self) -> usize;
}

/// In-process registry. The only implementation this system ships — an
/// external `REGISTRY_STORE_URL` is a Non-goal of the core (see config).
pub struct InMemoryRegistry {
    records: Arc<RwLock<HashMap<String, ServiceRecord>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), CoordinatorError> {
    let parsed = url::Url::parse(endpoint).map_err(|e| CoordinatorError::InvalidUrl {
        message: format!("{endpoint}: {e}"),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(CoordinatorError::InvalidUrl {
            message: format!("unsupported scheme in {endpoint}"),
        });
    }
    Ok(())
}

/// `MAJOR.MINOR.PATCH`, each component a non-empty run of digits. No
/// pre-release/build metadata support — services self-report a bare version.
fn validate_semver(version: &str) -> Result<(), CoordinatorError> {
    let parts: Vec<&str> = version.split('.').collect();
    let valid = parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if !valid {
        return Err(CoordinatorError::EnvelopeInvalid {
            message: format!("version {version:?} is not valid MAJOR.MINOR.PATCH semver"),
        });
    }
    Ok(())
}

fn validate_manifest(manifest: &Manifest) -> Result<(), CoordinatorError> {
    if manifest.endpoints.is_empty() {
        return Err(CoordinatorError::InvalidManifest {
            message: "manifest must declare at least one endpoint".into(),
        });
    }
    for endpoint in &manifest.endpoints {
        if endpoint.path.trim().is_empty() {
            return Err(CoordinatorError::InvalidManifest {
                message: "manifest endpoint path must not be empty".into(),
            });
        }
        if endpoint.method.trim().is_empty() {
            return Err(CoordinatorError::InvalidManifest {
                message: format!("manifest endpoint {} is missing a method", endpoint.path),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn register(
        &self,
        name: String,
        version: String,
        endpoint: String,
        health_path: String,
        metadata: ServiceMetadata,
        supports_rpc: bool,
    ) -> Result<String, CoordinatorError> {
        if name.trim().is_empty() || name.len() > 128 {
            return Err(CoordinatorError::EnvelopeInvalid {
                message: "service name must be 1-128 chars".into(),
            });
        }
        validate_semver(&version)?;
        validate_endpoint(&endpoint)?;

        let mut records = self.records.write().await;
        if records
            .values()
            .any(|r| r.name == name && r.status != ServiceStatus::Inactive)
        {
            return Err(CoordinatorError::NameConflict { name });
        }

        let id = Uuid::new_v4().to_string();
        let health_path = if health_path.is_empty() {
            "/health".to_string()
        } else {
            health_path
        };
        let record = ServiceRecord::new(
            id.clone(),
            name,
            version,
            endpoint.trim().to_string(),
            health_path,
            metadata,
            supports_rpc,
        );
        records.insert(id.clone(), record);
        Ok(id)
    }

    async fn complete_migration(
        &self,
        id: &str,
        manifest: Manifest,
    ) -> Result<ServiceRecord, CoordinatorError> {
        validate_manifest(&manifest)?;

        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| CoordinatorError::NotFound {
                message: format!("no service with id {id}"),
            })?;
        record.manifest = Some(manifest);
        record.status = ServiceStatus::Active;
        Ok(record.clone())
    }

    async fn list(&self, filter: ListFilter) -> Vec<ServiceRecord> {
        let records = self.records.read().await;
        let mut out: Vec<ServiceRecord> = records
            .values()
            .filter(|r| !filter.only_active || r.is_active())
            .filter(|r| match &filter.by_name {
                Some(n) => n == &r.name,
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by_key(|r| r.registered_at);
        out
    }

    async fn get_by_name(&self, name: &str) -> Option<ServiceRecord> {
        let records = self.records.read().await;
        records.values().find(|r| r.name == name).cloned()
    }

    async fn get_by_id(&self, id: &str) -> Option<ServiceRecord> {
        self.records.read().await.get(id).cloned()
    }

    async fn mark_inactive(&self, id: &str) -> Result<(), CoordinatorError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| CoordinatorError::NotFound {
                message: format!("no service with id {id}"),
            })?;
        record.status = ServiceStatus::Inactive;
        Ok(())
    }

    async fn delete_all(&self) -> usize {
        let mut records = self.records.write().await;
        let count = records.len();
        records.clear();
        count
    }
}
