use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Order status enum representing the lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }

}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing an order in the database.
///
/// `certificate_url` is empty until the certificate worker fills it in;
/// setting it never changes `status`. The invariant
/// `total_amount == tonnes * price_per_tonne` holds at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: i64,
    pub project_id: i64,
    pub tonnes: Decimal,
    pub price_per_tonne: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_id: String,
    pub certificate_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by checkout when creating an order. Identity and
/// timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub project_id: i64,
    pub tonnes: Decimal,
    pub price_per_tonne: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_id: String,
}

/// Request DTO for checkout
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
}

/// Response DTO for an order
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: i64,
    pub project_id: i64,
    pub tonnes: Decimal,
    pub price_per_tonne: Decimal,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_id: String,
    pub certificate_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            project_id: order.project_id,
            tonnes: order.tonnes,
            price_per_tonne: order.price_per_tonne,
            total_amount: order.total_amount,
            status: order.status,
            payment_id: order.payment_id,
            certificate_url: order.certificate_url,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
