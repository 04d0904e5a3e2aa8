//! # API Error Types
//!
//! Unified error handling for the GraphQL API layer. Every engine failure
//! maps to a distinct error code so clients can tell "someone else took
//! this alert" apart from "you are not allowed to".

use async_graphql::{Error as GraphQLError, ErrorExtensions};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use rescue_dispatch::DispatchError;

/// API-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid UUID format: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("{0}")]
    Conflict(String),

    #[error("Alert already taken by another responder: {0}")]
    AlreadyAssigned(String),

    #[error("Driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) | Self::InvalidUuid(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::AlreadyAssigned(_) | Self::DriverUnavailable(_) => {
                StatusCode::CONFLICT
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for GraphQL extensions
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidUuid(_) => "INVALID_UUID",
            Self::Conflict(_) => "CONFLICT",
            Self::AlreadyAssigned(_) => "ALREADY_ASSIGNED",
            Self::DriverUnavailable(_) => "DRIVER_UNAVAILABLE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound { entity, id } => Self::NotFound {
                entity_type: entity,
                id,
            },
            DispatchError::Validation(msg) => Self::InvalidInput(msg),
            conflict @ DispatchError::Conflict { .. } => Self::Conflict(conflict.to_string()),
            taken @ DispatchError::AlreadyAssigned { .. } => {
                Self::AlreadyAssigned(taken.to_string())
            }
            busy @ DispatchError::DriverUnavailable { .. } => {
                Self::DriverUnavailable(busy.to_string())
            }
            DispatchError::Storage(e) => Self::StorageUnavailable(e.to_string()),
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> GraphQLError {
        GraphQLError::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.error_code());
            e.set("status", self.status_code().as_u16());

            if let Self::NotFound { entity_type, id } = self {
                e.set("entity_type", entity_type.as_str());
                e.set("entity_id", id.as_str());
            }
        })
    }
}

impl From<ApiError> for GraphQLError {
    fn from(err: ApiError) -> Self {
        err.extend()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "code": self.error_code(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_domain::AlertStatus;
    use uuid::Uuid;

    #[test]
    fn test_dispatch_error_mapping_is_distinct() {
        let id = Uuid::new_v4();

        let taken: ApiError = DispatchError::AlreadyAssigned { alert_id: id }.into();
        assert_eq!(taken.error_code(), "ALREADY_ASSIGNED");
        assert_eq!(taken.status_code(), StatusCode::CONFLICT);

        let conflict: ApiError = DispatchError::Conflict {
            alert_id: id,
            status: AlertStatus::Pending,
        }
        .into();
        assert_eq!(conflict.error_code(), "CONFLICT");

        let busy: ApiError = DispatchError::DriverUnavailable { driver_id: id }.into();
        assert_eq!(busy.error_code(), "DRIVER_UNAVAILABLE");

        let missing: ApiError = DispatchError::not_found("Alert", id).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }
}
