use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A cart line: how many tonnes of one project's offsets a user intends
/// to buy. One line per (user, project); repeated additions merge.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub user_id: i64,
    pub project_id: i64,
    pub tonnes: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for adding a project to the cart
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddToCartRequest {
    pub project_id: i64,
    #[validate(custom = "crate::validation::validate_positive_tonnes")]
    pub tonnes: Decimal,
}

/// Request DTO for setting a cart line's quantity.
/// A value of zero or less removes the line.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    pub tonnes: Decimal,
}
