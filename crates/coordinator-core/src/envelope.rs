//! Canonical internal request shape shared by the HTTP and RPC inbound surfaces.
//!
//! An [`Envelope`] is immutable once built. Both inbound listeners construct one
//! from their wire format and hand it to the same `RoutingEngine`/`Dispatcher`
//! pipeline, so routing and dispatch never know which transport a request
//! arrived on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoordinatorError;

pub const ENVELOPE_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub context: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub version: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub source: String,
    pub payload: Payload,
}

impl Envelope {
    /// Builds a new envelope, generating `requestId` when the caller doesn't
    /// supply one.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        source: impl Into<String>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        query: impl Into<String>,
        metadata: HashMap<String, String>,
        context: HashMap<String, String>,
        request_id: Option<String>,
    ) -> Self {
        Self {
            version: ENVELOPE_VERSION.to_string(),
            request_id: request_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            timestamp: Utc::now(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            source: source.into(),
            payload: Payload {
                query: query.into(),
                metadata,
                context,
            },
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, CoordinatorError> {
        serde_json::to_vec(self).map_err(CoordinatorError::from)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, CoordinatorError> {
        serde_json::from_slice(bytes).map_err(|e| CoordinatorError::EnvelopeMalformed {
            message: e.to_string(),
        })
    }

    /// Checks required-field presence. Parsing already guarantees types; this
    /// additionally rejects empty `version`/`requestId`/`timestamp`/`source`.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.version.is_empty() {
            return Err(CoordinatorError::EnvelopeInvalid {
                message: "version is empty".into(),
            });
        }
        if self.request_id.is_empty() {
            return Err(CoordinatorError::EnvelopeInvalid {
                message: "requestId is empty".into(),
            });
        }
        if self.source.is_empty() {
            return Err(CoordinatorError::EnvelopeInvalid {
                message: "source is empty".into(),
            });
        }
        Ok(())
    }
}
