//! Typed errors for design generation and progress persistence.

use thiserror::Error;

/// Failures of a single design request. Never retried.
#[derive(Debug, Error)]
pub enum DesignError {
    /// The model call failed, returned an error status or timed out
    #[error("upstream model error: {0}")]
    Upstream(String),

    /// The model answered with something that is not a project design
    #[error("malformed design document: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for DesignError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DesignError::Upstream(format!("request timed out: {err}"))
        } else {
            DesignError::Upstream(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DesignError {
    fn from(err: serde_json::Error) -> Self {
        DesignError::Schema(err.to_string())
    }
}

/// Failures of the persistence gateway. Absence of a row is `UserNotFound`,
/// everything else is a failed operation.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("user {0} not found")]
    UserNotFound(uuid::Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unknown domain tag in storage: {0}")]
    UnknownDomain(String),
}
