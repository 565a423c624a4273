//! Integration-style coverage of the full two-stage registry lifecycle
//! (register -> migrate -> route-visible -> deactivate -> re-register),
//! exercised through the public `Registry` trait rather than
//! `InMemoryRegistry` internals.

use coordinator_core::registry::{InMemoryRegistry, ListFilter, Manifest, ManifestEndpoint, Registry, ServiceMetadata, ServiceStatus};
use coordinator_core::CoordinatorError;

fn manifest() -> Manifest {
    Manifest {
        endpoints: vec![ManifestEndpoint {
            path: "/api/process".into(),
            method: "POST".into(),
            description: Some("handles payment processing".into()),
        }],
        events_published: vec!["payment.completed".into()],
        ..Manifest::default()
    }
}

#[tokio::test]
async fn full_lifecycle_from_registration_to_reregistration() {
    let registry = InMemoryRegistry::new();

    let id = registry
        .register(
            "payments".into(),
            "1.2.0".into(),
            "http://payments.internal:4000".into(),
            "/healthz".into(),
            ServiceMetadata {
                capabilities: vec!["payments".into(), "refunds".into()],
            },
            false,
        )
        .await
        .unwrap();

    // Pending services aren't routable yet.
    let active = registry.list(ListFilter { only_active: true, by_name: None }).await;
    assert!(active.is_empty());

    let record = registry.complete_migration(&id, manifest()).await.unwrap();
    assert_eq!(record.status, ServiceStatus::Active);
    assert_eq!(record.manifest.as_ref().unwrap().events_published, vec!["payment.completed"]);

    let active = registry.list(ListFilter { only_active: true, by_name: None }).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "payments");

    // Deactivating frees the name for a fresh registration.
    registry.mark_inactive(&id).await.unwrap();
    let active = registry.list(ListFilter { only_active: true, by_name: None }).await;
    assert!(active.is_empty());

    let second_id = registry
        .register(
            "payments".into(),
            "1.3.0".into(),
            "http://payments-v2.internal:4000".into(),
            String::new(),
            ServiceMetadata::default(),
            true,
        )
        .await
        .unwrap();
    assert_ne!(id, second_id);
}

#[tokio::test]
async fn migration_before_registration_reports_not_found() {
    let registry = InMemoryRegistry::new();
    let err = registry.complete_migration("no-such-id", manifest()).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::NotFound { .. }));
}

#[tokio::test]
async fn delete_all_clears_every_record_regardless_of_status() {
    let registry = InMemoryRegistry::new();
    let id = registry
        .register("svc".into(), "1.0.0".into(), "http://svc:4000".into(), String::new(), ServiceMetadata::default(), false)
        .await
        .unwrap();
    registry.complete_migration(&id, manifest()).await.unwrap();
    registry
        .register("svc-2".into(), "1.0.0".into(), "http://svc2:4000".into(), String::new(), ServiceMetadata::default(), false)
        .await
        .unwrap();

    let removed = registry.delete_all().await;
    assert_eq!(removed, 2);
    assert!(registry.list(ListFilter::default()).await.is_empty());
}
