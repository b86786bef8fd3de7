use std::future::Future;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::time::timeout;

use crate::cart::{CartError, CartLine};
use crate::db::STORE_TIMEOUT;

/// Per-user, per-project quantity ledger. Implementations must make
/// `add_to_cart` an atomic merge at the storage layer; concurrent adds
/// for the same (user, project) must not lose updates.
pub trait CartStore: Clone + Send + Sync + 'static {
    /// Merge `tonnes` into the line for (user, project), creating it if
    /// absent.
    fn add_to_cart(
        &self,
        user_id: i64,
        project_id: i64,
        tonnes: Decimal,
    ) -> impl Future<Output = Result<CartLine, CartError>> + Send;

    /// All lines for a user. Order is not significant.
    fn get_cart(&self, user_id: i64)
        -> impl Future<Output = Result<Vec<CartLine>, CartError>> + Send;

    /// Set a line's tonnes to an absolute value; zero or less removes
    /// the line. No-op if the line is absent.
    fn update_item(
        &self,
        user_id: i64,
        project_id: i64,
        tonnes: Decimal,
    ) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Remove one line. Idempotent.
    fn remove_item(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Remove every line for a user. Idempotent.
    fn clear(&self, user_id: i64) -> impl Future<Output = Result<(), CartError>> + Send;
}

/// Postgres-backed cart store
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new CartRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CartStore for CartRepository {
    async fn add_to_cart(
        &self,
        user_id: i64,
        project_id: i64,
        tonnes: Decimal,
    ) -> Result<CartLine, CartError> {
        // Atomic upsert: the increment happens inside the database, so
        // concurrent adds for the same (user, project) cannot lose updates
        let line = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, CartLine>(
                r#"
                INSERT INTO cart_items (user_id, project_id, tonnes)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, project_id)
                DO UPDATE SET tonnes = cart_items.tonnes + EXCLUDED.tonnes, updated_at = NOW()
                RETURNING id, user_id, project_id, tonnes, created_at, updated_at
                "#,
            )
            .bind(user_id)
            .bind(project_id)
            .bind(tonnes)
            .fetch_one(&self.pool),
        )
        .await
        .map_err(|_| CartError::Timeout)??;

        Ok(line)
    }

    async fn get_cart(&self, user_id: i64) -> Result<Vec<CartLine>, CartError> {
        let lines = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, CartLine>(
                r#"
                SELECT id, user_id, project_id, tonnes, created_at, updated_at
                FROM cart_items
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await
        .map_err(|_| CartError::Timeout)??;

        Ok(lines)
    }

    async fn update_item(
        &self,
        user_id: i64,
        project_id: i64,
        tonnes: Decimal,
    ) -> Result<(), CartError> {
        if tonnes <= Decimal::ZERO {
            return self.remove_item(user_id, project_id).await;
        }

        timeout(
            STORE_TIMEOUT,
            sqlx::query(
                r#"
                UPDATE cart_items
                SET tonnes = $3, updated_at = NOW()
                WHERE user_id = $1 AND project_id = $2
                "#,
            )
            .bind(user_id)
            .bind(project_id)
            .bind(tonnes)
            .execute(&self.pool),
        )
        .await
        .map_err(|_| CartError::Timeout)??;

        Ok(())
    }

    async fn remove_item(&self, user_id: i64, project_id: i64) -> Result<(), CartError> {
        timeout(
            STORE_TIMEOUT,
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND project_id = $2")
                .bind(user_id)
                .bind(project_id)
                .execute(&self.pool),
        )
        .await
        .map_err(|_| CartError::Timeout)??;

        Ok(())
    }

    async fn clear(&self, user_id: i64) -> Result<(), CartError> {
        timeout(
            STORE_TIMEOUT,
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                .bind(user_id)
                .execute(&self.pool),
        )
        .await
        .map_err(|_| CartError::Timeout)??;

        Ok(())
    }
}
