//! Error taxonomy for htb-core.
//!
//! Provisioning timeouts, already-owned targets and declined
//! confirmations are outcomes, not errors: see `ProvisioningStatus`
//! and `DispatchOutcome`.

use htb_api::ApiError;

use super::kind::ResourceKind;

/// Errors that abort the current operation.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("no {kind} found matching '{term}'")]
    NotFound { kind: ResourceKind, term: String },

    #[error("'{term}' matches several {kind} entries: {}", candidates.join(", "))]
    Ambiguous {
        kind: ResourceKind,
        term: String,
        candidates: Vec<String>,
    },

    #[error("transport error: {0}")]
    Transport(ApiError),

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("no active machine")]
    NoActiveMachine,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ApiError> for LabError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Shape(detail) => LabError::Shape(detail),
            other => LabError::Transport(other),
        }
    }
}

/// Result type for htb-core operations.
pub type Result<T> = std::result::Result<T, LabError>;
