use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for cart operations
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cart operation timed out")]
    Timeout,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        CartError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            CartError::DatabaseError(msg) => {
                tracing::error!("Cart database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            CartError::Timeout => {
                tracing::error!("Cart store operation timed out");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Cart operation timed out".to_string(),
                )
            }
            CartError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
