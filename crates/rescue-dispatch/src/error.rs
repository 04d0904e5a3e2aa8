//! Dispatch engine error taxonomy.
//!
//! Every variant is an expected, recoverable-by-the-caller condition; the
//! gateway maps each to a distinct user-visible outcome. Storage faults are
//! carried through unchanged and never retried here.

use rescue_domain::AlertStatus;
use rescue_persistence::PersistenceError;
use thiserror::Error;
use uuid::Uuid;

/// Dispatch engine errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Alert {alert_id} is {status}, operation requires a different state")]
    Conflict { alert_id: Uuid, status: AlertStatus },

    #[error("Alert {alert_id} was already taken by another responder")]
    AlreadyAssigned { alert_id: Uuid },

    #[error("Driver {driver_id} is not available")]
    DriverUnavailable { driver_id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    Storage(#[from] PersistenceError),
}

impl DispatchError {
    /// Map a persistence error, promoting the store's not-found case to the
    /// engine's typed variant.
    pub fn from_store(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { entity_type, key } => Self::NotFound {
                entity: entity_type,
                id: key,
            },
            other => Self::Storage(other),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
