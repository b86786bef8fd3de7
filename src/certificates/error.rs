use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for certificate operations
#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Certificate operation timed out")]
    Timeout,

    #[error("Certificate not found for order {0}")]
    NotFoundForOrder(uuid::Uuid),

    #[error("Failed to update order record: {0}")]
    OrderUpdateFailed(String),
}

impl From<sqlx::Error> for CertificateError {
    fn from(err: sqlx::Error) -> Self {
        CertificateError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for CertificateError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            CertificateError::DatabaseError(msg) => {
                tracing::error!("Certificate database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            CertificateError::Timeout => {
                tracing::error!("Certificate store operation timed out");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Certificate operation timed out".to_string(),
                )
            }
            CertificateError::NotFoundForOrder(order_id) => (
                StatusCode::NOT_FOUND,
                format!("Certificate for order {} not found", order_id),
            ),
            CertificateError::OrderUpdateFailed(msg) => {
                tracing::error!("Order update during certificate processing failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
