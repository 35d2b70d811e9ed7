//! # Engine Error Taxonomy
//!
//! The business-rule error surface of the engine.
//!
//! ```text
//! Validation    malformed/out-of-range input, surfaced verbatim with the
//!               offending field (never retry)
//! Conflict      business-rule collision: a second open register, a second
//!               same-day closure (never retry)
//! NotFound      the referenced register/closure does not exist
//! InvalidState  operation not legal for the register's current status
//! Storage       the data layer failed (the only possibly-transient class)
//! ```

use thiserror::Error;

use caja_core::ValidationError;
use caja_db::DbError;

/// Business-rule errors surfaced to callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A business-rule collision (duplicate open register, duplicate
    /// same-day closure). User-facing rejection, not a transient fault.
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation is not legal for the register's current status.
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// Data-layer failure.
    #[error(transparent)]
    Storage(#[from] DbError),
}

impl EngineError {
    pub fn conflict(reason: impl Into<String>) -> Self {
        EngineError::Conflict {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        EngineError::InvalidState {
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
