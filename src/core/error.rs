use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Application error taxonomy. Repositories return raw diesel errors;
/// services translate recognized conditions into one of these kinds before
/// they reach the API layer, which only maps kind → status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] diesel::result::Error),

    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            Self::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Pool(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication(_) => "AUTHENTICATION_FAILED",
            Self::Authorization(_) => "AUTHORIZATION_FAILED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(diesel::result::Error::NotFound) => "NOT_FOUND",
            Self::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Pool(_) | Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_id: Option<Uuid>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            let error_id = Uuid::new_v4();
            tracing::error!(%error_id, error = %self, "request failed");
            ErrorBody {
                error_code,
                message: "An internal server error occurred".to_string(),
                details: None,
                error_id: Some(error_id),
            }
        } else {
            let details = match &self {
                AppError::Validation {
                    field: Some(field), ..
                } => Some(serde_json::json!({ "field": field })),
                AppError::NotFound { resource, id } => {
                    Some(serde_json::json!({ "resource": resource, "identifier": id }))
                }
                _ => None,
            };
            ErrorBody {
                error_code,
                message: self.to_string(),
                details,
                error_id: None,
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_per_kind() {
        assert_eq!(
            AppError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::authentication("no token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::authorization("nope").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::not_found("Deal", Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict("dup").status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn unique_violations_surface_as_conflict() {
        let err = AppError::Database(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_string()),
        ));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[test]
    fn storage_failures_do_not_leak() {
        let err = AppError::Database(diesel::result::Error::BrokenTransactionManager);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
