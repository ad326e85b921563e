//! Domain-level error taxonomy for Pageforge.

use crate::config::ConfigError;
use crate::domain::stage::Stage;
use crate::host::HostError;

/// Errors produced while validating an inbound task request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid task identifier {task:?}: {reason}")]
    InvalidTask { task: String, reason: String },

    #[error("round must be a positive integer, got {0}")]
    InvalidRound(i64),

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

/// Transport-level class a failure maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was unusable (client error).
    Rejected,
    /// The presented credential was missing or wrong.
    Forbidden,
    /// Something downstream failed after validation (server error).
    Downstream,
}

/// Pageforge domain errors.
#[derive(Debug, thiserror::Error)]
pub enum PageforgeError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{stage} failed: {source}")]
    Publish {
        stage: Stage,
        #[source]
        source: HostError,
    },

    #[error("could not resolve head of branch {branch}: {source}")]
    Resolve {
        branch: String,
        #[source]
        source: HostError,
    },

    #[error("evaluation callback was not acknowledged after {attempts} attempt(s)")]
    NotificationExhausted { attempts: u32 },
}

impl PageforgeError {
    /// Pipeline stage the error aborted, if it came from the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Unauthorized(_) | Self::Validation(_) => Some(Stage::ValidateInput),
            Self::Publish { stage, .. } => Some(*stage),
            Self::Resolve { .. } => Some(Stage::ResolveRevision),
            Self::NotificationExhausted { .. } => Some(Stage::Notify),
            Self::Config(_) => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized(_) => ErrorClass::Forbidden,
            Self::Validation(_) => ErrorClass::Rejected,
            _ => ErrorClass::Downstream,
        }
    }
}

/// Result type for Pageforge domain operations.
pub type Result<T> = std::result::Result<T, PageforgeError>;
