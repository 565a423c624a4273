//! # Error Handling for the Coordinator Core
//!
//! All operations across the coordinator crates return [`CoordinatorError`]. Each
//! variant carries enough context to render a stable `{code, message}` pair to a
//! caller (HTTP or RPC) without leaking internal detail, and to classify the
//! failure for logging and retry decisions.
//!
//! ## Error Categories
//!
//! - **Validation** — `EnvelopeInvalid`, `EnvelopeMalformed`, `InvalidUrl`, `InvalidManifest`: 400-class, never retried.
//! - **Conflict** — `NameConflict`: 409.
//! - **NotFound** — `NotFound`: 404.
//! - **Upstream** — `AiUnavailable`, `BackendTimeout`, `BackendError`, `TransportError`: recovered locally (fallback / cascade advance).
//! - **Exhaustion** — `NoActiveServices`, `NoGoodResponse`: surfaced to the caller.
//! - **Fatal** — `MisconfigurationOnStartup`: aborts process start.

use serde::{Deserialize, Serialize};

/// Coarse classification used for logging, retry policy, and HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Upstream,
    Exhaustion,
    Fatal,
}

/// Primary error type for all coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("envelope malformed: {message}")]
    EnvelopeMalformed { message: String },

    #[error("envelope invalid: {message}")]
    EnvelopeInvalid { message: String },

    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("service name already registered: {name}")]
    NameConflict { name: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("AI ranker unavailable: {message}")]
    AiUnavailable { message: String },

    #[error("backend request timed out after {elapsed_ms}ms")]
    BackendTimeout { elapsed_ms: u64 },

    #[error("backend error: {message}")]
    BackendError { message: String },

    #[error("transport error: {message}")]
    TransportError { message: String },

    #[error("no active services are registered")]
    NoActiveServices,

    #[error("no candidate produced an acceptable response")]
    NoGoodResponse {
        attempts: Vec<crate::dispatch::AttemptRecord>,
    },

    #[error("configuration error: {message}")]
    MisconfigurationOnStartup { message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl CoordinatorError {
    pub fn category(&self) -> ErrorCategory {
        use CoordinatorError::*;
        match self {
            EnvelopeMalformed { .. } | EnvelopeInvalid { .. } | InvalidUrl { .. } | InvalidManifest { .. } => {
                ErrorCategory::Validation
            }
            NameConflict { .. } => ErrorCategory::Conflict,
            NotFound { .. } => ErrorCategory::NotFound,
            AiUnavailable { .. } | BackendTimeout { .. } | BackendError { .. } | TransportError { .. } => {
                ErrorCategory::Upstream
            }
            NoActiveServices | NoGoodResponse { .. } => ErrorCategory::Exhaustion,
            MisconfigurationOnStartup { .. } => ErrorCategory::Fatal,
            SerializationError { .. } => ErrorCategory::Validation,
        }
    }

    /// A stable machine-readable code, safe to hand to an external caller.
    pub fn error_code(&self) -> &'static str {
        use CoordinatorError::*;
        match self {
            EnvelopeMalformed { .. } => "ENVELOPE_MALFORMED",
            EnvelopeInvalid { .. } => "ENVELOPE_INVALID",
            InvalidUrl { .. } => "INVALID_URL",
            InvalidManifest { .. } => "INVALID_MANIFEST",
            NameConflict { .. } => "NAME_CONFLICT",
            NotFound { .. } => "NOT_FOUND",
            AiUnavailable { .. } => "AI_UNAVAILABLE",
            BackendTimeout { .. } => "BACKEND_TIMEOUT",
            BackendError { .. } => "BACKEND_ERROR",
            TransportError { .. } => "TRANSPORT_ERROR",
            NoActiveServices => "NO_ACTIVE_SERVICES",
            NoGoodResponse { .. } => "NO_GOOD_RESPONSE",
            MisconfigurationOnStartup { .. } => "MISCONFIGURATION",
            SerializationError { .. } => "SERIALIZATION_ERROR",
        }
    }

    /// HTTP status the inbound HTTP surface should render for this error.
    pub fn http_status(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 400,
            ErrorCategory::Conflict => 409,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Upstream => 502,
            ErrorCategory::Exhaustion => 422,
            ErrorCategory::Fatal => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Upstream)
    }
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(error: serde_json::Error) -> Self {
        CoordinatorError::SerializationError {
            message: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for CoordinatorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            CoordinatorError::BackendTimeout { elapsed_ms: 0 }
        } else {
            CoordinatorError::BackendError {
                message: error.to_string(),
            }
        }
    }
}

#[cfg(feature = "monitoring")]
impl From<prometheus::Error> for CoordinatorError {
    fn from(error: prometheus::Error) -> Self {
        CoordinatorError::MisconfigurationOnStartup {
            message: format!("prometheus metrics error: {}", error),
        }
    }
}

/// Wire shape for an error rendered to an external caller — identical on the
/// HTTP and RPC surfaces so the two protocols never drift on error shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&CoordinatorError> for ErrorBody {
    fn from(err: &CoordinatorError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}
