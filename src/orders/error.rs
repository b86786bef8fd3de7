use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::cart::CartError;
use crate::error::ApiError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Order operation timed out")]
    Timeout,

    #[error("Order not found")]
    NotFound,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::DatabaseError(err.to_string())
    }
}

/// Checkout reads the cart through the cart store; surface its failures
/// as order errors to the caller.
impl From<CartError> for OrderError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Timeout => OrderError::Timeout,
            CartError::DatabaseError(msg) => OrderError::DatabaseError(msg),
            CartError::ValidationError(msg) => OrderError::ValidationError(msg),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::DatabaseError(msg) => ApiError::InternalError(msg),
            OrderError::Timeout => ApiError::InternalError("store timeout".to_string()),
            OrderError::NotFound => ApiError::NotFound {
                resource: "Order".to_string(),
                id: "unknown".to_string(),
            },
            OrderError::EmptyCart => ApiError::BadRequest("Cart is empty".to_string()),
            OrderError::ValidationError(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            OrderError::DatabaseError(msg) => {
                tracing::error!("Order database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            OrderError::Timeout => {
                tracing::error!("Order store operation timed out");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Order operation timed out".to_string(),
                )
            }
            OrderError::NotFound => (StatusCode::NOT_FOUND, "Order not found".to_string()),
            OrderError::EmptyCart => (StatusCode::BAD_REQUEST, "Cart is empty".to_string()),
            OrderError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
