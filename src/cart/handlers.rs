// HTTP handlers for cart endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::cart::{AddToCartRequest, CartError, CartLine, CartStore, UpdateCartItemRequest};
use crate::AppState;

/// Handler for POST /api/v1/cart/{user_id}/items
/// Adds a project to the user's cart, merging with an existing line
#[utoipa::path(
    post,
    path = "/api/v1/cart/{user_id}/items",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Item added to cart", body = CartLine),
        (status = 400, description = "Invalid user ID or request body"),
        (status = 500, description = "Failed to add item to cart")
    ),
    tag = "cart"
)]
pub async fn add_to_cart_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartLine>), CartError> {
    request
        .validate()
        .map_err(|e| CartError::ValidationError(e.to_string()))?;

    tracing::debug!(
        "Adding {} tonnes of project {} to cart for user {}",
        request.tonnes,
        request.project_id,
        user_id
    );

    let line = state
        .cart_repo
        .add_to_cart(user_id, request.project_id, request.tonnes)
        .await?;

    Ok((StatusCode::CREATED, Json(line)))
}

/// Handler for GET /api/v1/cart/{user_id}
/// Retrieves all cart lines for the user
#[utoipa::path(
    get,
    path = "/api/v1/cart/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "List of cart lines", body = Vec<CartLine>),
        (status = 500, description = "Failed to retrieve cart")
    ),
    tag = "cart"
)]
pub async fn get_cart_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<CartLine>>, CartError> {
    let lines = state.cart_repo.get_cart(user_id).await?;
    Ok(Json(lines))
}

/// Handler for PUT /api/v1/cart/{user_id}/items/{project_id}
/// Sets a cart line's tonnes; zero or less removes the line
#[utoipa::path(
    put,
    path = "/api/v1/cart/{user_id}/items/{project_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("project_id" = i64, Path, description = "Project ID")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 204, description = "Cart line updated"),
        (status = 400, description = "Invalid IDs or request body"),
        (status = 500, description = "Failed to update cart line")
    ),
    tag = "cart"
)]
pub async fn update_cart_item_handler(
    State(state): State<AppState>,
    Path((user_id, project_id)): Path<(i64, i64)>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<StatusCode, CartError> {
    state
        .cart_repo
        .update_item(user_id, project_id, request.tonnes)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /api/v1/cart/{user_id}/items/{project_id}
/// Removes one line from the cart; no-op if absent
#[utoipa::path(
    delete,
    path = "/api/v1/cart/{user_id}/items/{project_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("project_id" = i64, Path, description = "Project ID")
    ),
    responses(
        (status = 204, description = "Cart line removed"),
        (status = 500, description = "Failed to remove cart line")
    ),
    tag = "cart"
)]
pub async fn remove_from_cart_handler(
    State(state): State<AppState>,
    Path((user_id, project_id)): Path<(i64, i64)>,
) -> Result<StatusCode, CartError> {
    state.cart_repo.remove_item(user_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /api/v1/cart/{user_id}
/// Clears every line in the user's cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Cart cleared"),
        (status = 500, description = "Failed to clear cart")
    ),
    tag = "cart"
)]
pub async fn clear_cart_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, CartError> {
    state.cart_repo.clear(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
