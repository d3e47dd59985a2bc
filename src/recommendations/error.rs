use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

/// Error types for recommendation operations
#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(i32),

    #[error("Recommendation not found: {0}")]
    RecommendationNotFound(Uuid),

    #[error("Invalid rule definition: {0}")]
    InvalidRuleDefinition(String),

    #[error("Reconciliation conflict: {0}")]
    ReconciliationConflict(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for RecommendationError {
    fn from(err: sqlx::Error) -> Self {
        RecommendationError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for RecommendationError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            RecommendationError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            RecommendationError::VehicleNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Vehicle with id {} not found", id),
            ),
            RecommendationError::RecommendationNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Recommendation with id {} not found", id),
            ),
            RecommendationError::InvalidRuleDefinition(msg) => {
                tracing::error!("Invalid rule definition: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            RecommendationError::ReconciliationConflict(msg) => (StatusCode::CONFLICT, msg),
            RecommendationError::InvalidTransition(msg) => (StatusCode::BAD_REQUEST, msg),
            RecommendationError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RecommendationError::VehicleNotFound(42);
        assert_eq!(error.to_string(), "Vehicle not found: 42");

        let error = RecommendationError::InvalidTransition(
            "cannot leave terminal state completed".to_string(),
        );
        assert!(error.to_string().contains("Invalid status transition"));
    }

    #[test]
    fn test_error_from_sqlx() {
        let sqlx_error = sqlx::Error::RowNotFound;
        let error: RecommendationError = sqlx_error.into();
        assert!(matches!(error, RecommendationError::DatabaseError(_)));
    }
}
