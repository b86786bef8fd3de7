use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::time::timeout;
use uuid::Uuid;

use crate::db::STORE_TIMEOUT;
use crate::orders::{NewOrder, Order, OrderError, OrderStatus};

/// Order records and the queries reporting runs over them.
pub trait OrderStore: Clone + Send + Sync + 'static {
    /// Persist a new order, assigning identity and timestamps.
    fn create(&self, order: NewOrder) -> impl Future<Output = Result<Order, OrderError>> + Send;

    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Order>, OrderError>> + Send;

    fn get_by_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Order>, OrderError>> + Send;

    /// Partial update of status only.
    fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> impl Future<Output = Result<(), OrderError>> + Send;

    /// Partial update of certificate_url only; status is untouched.
    fn update_certificate_url(
        &self,
        id: Uuid,
        url: &str,
    ) -> impl Future<Output = Result<(), OrderError>> + Send;

    /// Orders created within [start, end], inclusive on both bounds.
    fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Order>, OrderError>> + Send;

    /// Orders still pending whose creation predates `cutoff`.
    fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Order>, OrderError>> + Send;

    /// Completed orders whose certificate_url was never filled in.
    /// Feeds certificate reconciliation.
    fn find_completed_missing_certificate_url(
        &self,
    ) -> impl Future<Output = Result<Vec<Order>, OrderError>> + Send;
}

const ORDER_COLUMNS: &str = "id, user_id, project_id, tonnes, price_per_tonne, total_amount, \
                             status, payment_id, certificate_url, created_at, updated_at";

/// Postgres-backed order store
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new OrderRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for OrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, OrderError> {
        let query = format!(
            r#"
            INSERT INTO orders
                (user_id, project_id, tonnes, price_per_tonne, total_amount, status, payment_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let order = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Order>(&query)
                .bind(order.user_id)
                .bind(order.project_id)
                .bind(order.tonnes)
                .bind(order.price_per_tonne)
                .bind(order.total_amount)
                .bind(order.status)
                .bind(&order.payment_id)
                .fetch_one(&self.pool),
        )
        .await
        .map_err(|_| OrderError::Timeout)??;

        Ok(order)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Order>, OrderError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");

        let order = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Order>(&query)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(|_| OrderError::Timeout)??;

        Ok(order)
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Order>, OrderError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        );

        let orders = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Order>(&query)
                .bind(user_id)
                .fetch_all(&self.pool),
        )
        .await
        .map_err(|_| OrderError::Timeout)??;

        Ok(orders)
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<(), OrderError> {
        let result = timeout(
            STORE_TIMEOUT,
            sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status)
                .bind(id)
                .execute(&self.pool),
        )
        .await
        .map_err(|_| OrderError::Timeout)??;

        if result.rows_affected() == 0 {
            return Err(OrderError::NotFound);
        }

        Ok(())
    }

    async fn update_certificate_url(&self, id: Uuid, url: &str) -> Result<(), OrderError> {
        let result = timeout(
            STORE_TIMEOUT,
            sqlx::query(
                "UPDATE orders SET certificate_url = $1, updated_at = NOW() WHERE id = $2",
            )
            .bind(url)
            .bind(id)
            .execute(&self.pool),
        )
        .await
        .map_err(|_| OrderError::Timeout)??;

        if result.rows_affected() == 0 {
            return Err(OrderError::NotFound);
        }

        Ok(())
    }

    async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE created_at >= $1 AND created_at <= $2 ORDER BY created_at"
        );

        let orders = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Order>(&query)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool),
        )
        .await
        .map_err(|_| OrderError::Timeout)??;

        Ok(orders)
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = 'pending' AND created_at < $1"
        );

        let orders = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Order>(&query)
                .bind(cutoff)
                .fetch_all(&self.pool),
        )
        .await
        .map_err(|_| OrderError::Timeout)??;

        Ok(orders)
    }

    async fn find_completed_missing_certificate_url(&self) -> Result<Vec<Order>, OrderError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status = 'completed' AND certificate_url = ''"
        );

        let orders = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Order>(&query).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| OrderError::Timeout)??;

        Ok(orders)
    }
}
