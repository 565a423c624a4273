//! # Coordinator Core
//!
//! Shared primitives for the coordinator control plane: the canonical
//! [`Envelope`](envelope::Envelope) request shape, the service [`registry`],
//! the deterministic [`keyword_index`] fallback ranker, the [`changelog`]
//! audit ring, startup [`config`], and the [`error`] taxonomy every other
//! coordinator crate builds on.
//!
//! ## Features
//!
//! - `monitoring` — enables the `prometheus::Error` conversion on
//!   [`error::CoordinatorError`]; the metrics themselves live in
//!   `coordinator-api::monitoring`.
//! - `test-util` — exposes `mockall`-generated mocks (e.g. `registry::MockRegistry`)
//!   for use in other crates' tests.

pub mod changelog;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod keyword_index;
pub mod registry;

pub use dispatch::{AttemptRecord, CascadeResult, Candidate, DispatchPolicy, RejectReason, StopReason};
pub use envelope::Envelope;
pub use error::{CoordinatorError, ErrorBody, ErrorCategory};
pub use keyword_index::KeywordIndex;
pub use registry::{InMemoryRegistry, Registry, ServiceRecord, ServiceStatus};

#[cfg(any(test, feature = "test-util"))]
pub use registry::MockRegistry;

/// Current version of the coordinator core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for crates consuming coordinator-core.
pub mod prelude {
    pub use crate::{
        changelog::{ChangeEvent, ChangeEventType, Changelog},
        config::CoordinatorConfig,
        envelope::Envelope,
        error::{CoordinatorError, ErrorCategory},
        keyword_index::KeywordIndex,
        registry::{InMemoryRegistry, ListFilter, Registry, ServiceRecord, ServiceStatus},
        AttemptRecord, CascadeResult, Candidate, DispatchPolicy, RejectReason, StopReason,
    };
    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};
    pub use uuid::Uuid;
}
