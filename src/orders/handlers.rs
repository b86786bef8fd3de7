// HTTP handlers for order endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::certificates::{Certificate, CertificateError, CertificateStore};
use crate::orders::{CheckoutRequest, OrderError, OrderResponse, OrderStore};
use crate::AppState;

/// Handler for POST /api/v1/orders/{user_id}/checkout
/// Converts the user's cart into a completed order. Best-effort side
/// effects (cart clear, certificate row, queue publish) may fail
/// without failing the checkout; they are logged here.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{user_id}/checkout",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Empty cart or invalid request"),
        (status = 500, description = "Checkout failed")
    ),
    tag = "orders"
)]
pub async fn checkout_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let outcome = state
        .order_service
        .checkout(user_id, &request.payment_method)
        .await?;

    for warning in &outcome.warnings {
        tracing::warn!("Checkout side effect failed for user {}: {}", user_id, warning);
    }

    Ok((StatusCode::CREATED, Json(outcome.order.into())))
}

/// Handler for GET /api/v1/orders/{order_id}
/// Retrieves a single order by its ID
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "The order", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Failed to retrieve order")
    ),
    tag = "orders"
)]
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state
        .order_repo
        .get_by_id(order_id)
        .await?
        .ok_or(OrderError::NotFound)?;
    Ok(Json(order.into()))
}

/// Handler for GET /api/v1/orders/{user_id}/history
/// Retrieves the user's order history
#[utoipa::path(
    get,
    path = "/api/v1/orders/{user_id}/history",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "List of orders", body = Vec<OrderResponse>),
        (status = 500, description = "Failed to retrieve order history")
    ),
    tag = "orders"
)]
pub async fn order_history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state.order_repo.get_by_user(user_id).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// Handler for GET /api/v1/orders/{user_id}/certificates
/// Retrieves the user's certificates
#[utoipa::path(
    get,
    path = "/api/v1/orders/{user_id}/certificates",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "List of certificates", body = Vec<Certificate>),
        (status = 500, description = "Failed to retrieve certificates")
    ),
    tag = "orders"
)]
pub async fn user_certificates_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Certificate>>, CertificateError> {
    let certificates = state.cert_repo.get_by_user(user_id).await?;
    Ok(Json(certificates))
}
