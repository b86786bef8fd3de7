use chrono::Utc;
use rust_decimal::Decimal;

use crate::cart::CartStore;
use crate::certificates::{CertificateGenerationMessage, CertificateStore, NewCertificate};
use crate::clients::{ProjectCatalog, UserDirectory};
use crate::orders::{NewOrder, Order, OrderError, OrderStatus, OrderStore, PriceCalculator};
use crate::queue::MessageQueue;

/// A best-effort checkout step that failed. Checkout still succeeded;
/// these exist so callers and tests can assert on the failures instead
/// of scraping logs. The lingering state each one leaves behind is
/// repaired (or at least surfaced) by the scheduler's reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutWarning {
    /// Cart entries linger after a completed order
    #[error("failed to clear cart: {0}")]
    CartClearFailed(String),

    /// No pending certificate row exists for the order
    #[error("failed to create certificate record: {0}")]
    CertificateCreateFailed(String),

    /// No generation request reached the queue; the certificate stays
    /// pending until reconciliation re-publishes it
    #[error("failed to publish certificate generation message: {0}")]
    PublishFailed(String),
}

/// Result of a successful checkout: the authoritative order plus any
/// best-effort side effects that failed along the way.
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub warnings: Vec<CheckoutWarning>,
}

/// Orchestrates checkout across the cart, order, and certificate stores
/// and the generation queue.
#[derive(Clone)]
pub struct OrderService<C, O, X, Q> {
    carts: C,
    orders: O,
    certificates: X,
    queue: Q,
    queue_name: String,
    catalog: ProjectCatalog,
    users: UserDirectory,
}

impl<C, O, X, Q> OrderService<C, O, X, Q>
where
    C: CartStore,
    O: OrderStore,
    X: CertificateStore,
    Q: MessageQueue,
{
    pub fn new(carts: C, orders: O, certificates: X, queue: Q, queue_name: String) -> Self {
        Self {
            carts,
            orders,
            certificates,
            queue,
            queue_name,
            catalog: ProjectCatalog::new(),
            users: UserDirectory::new(),
        }
    }

    /// Convert the user's cart into a completed order, a pending
    /// certificate, and a queued generation request.
    ///
    /// The order write and its completion are fatal steps: if either
    /// fails, checkout aborts with an error. Everything after — cart
    /// clear, certificate row, queue publish — is best effort and
    /// reported through `CheckoutOutcome::warnings`; the order is
    /// returned to the caller regardless.
    ///
    /// A cart spanning several projects still produces a single order,
    /// tagged with the first cart line's project. Known quirk carried
    /// over from the original service; per-project orders were
    /// deliberately not introduced.
    pub async fn checkout(
        &self,
        user_id: i64,
        payment_method: &str,
    ) -> Result<CheckoutOutcome, OrderError> {
        if payment_method.trim().is_empty() {
            return Err(OrderError::ValidationError(
                "Payment method is required".to_string(),
            ));
        }

        // 1. A checkout needs something to buy
        let lines = self.carts.get_cart(user_id).await?;
        let first_line = match lines.first() {
            Some(line) => line.clone(),
            None => return Err(OrderError::EmptyCart),
        };

        // 2. Price every line against the catalog
        let mut total_tonnes = Decimal::ZERO;
        let mut line_totals = Vec::with_capacity(lines.len());
        for line in &lines {
            let price = self.catalog.price_per_tonne(line.project_id);
            total_tonnes += line.tonnes;
            line_totals.push(PriceCalculator::line_total(line.tonnes, price));
        }
        let total_amount = PriceCalculator::order_total(&line_totals);

        // 3. Fatal: the order record is the financial source of truth
        let order = self
            .orders
            .create(NewOrder {
                user_id,
                project_id: first_line.project_id,
                tonnes: total_tonnes,
                price_per_tonne: self.catalog.price_per_tonne(first_line.project_id),
                total_amount,
                status: OrderStatus::Pending,
                payment_id: payment_id(user_id),
            })
            .await?;

        // 4. Fatal: mock payment always succeeds, so complete
        // immediately. If this update fails the order stays pending —
        // an operator-visible anomaly, not rolled back.
        self.orders
            .update_status(order.id, OrderStatus::Completed)
            .await?;
        let mut order = order;
        order.status = OrderStatus::Completed;

        let mut warnings = Vec::new();

        // 5. Best effort: a lingering cart must not fail the checkout
        if let Err(e) = self.carts.clear(user_id).await {
            tracing::warn!("Failed to clear cart for user {}: {}", user_id, e);
            warnings.push(CheckoutWarning::CartClearFailed(e.to_string()));
        }

        // 6. Best effort: pending certificate row
        if let Err(e) = self
            .certificates
            .create(NewCertificate {
                order_id: order.id,
                user_id,
                project_id: order.project_id,
                tonnes: order.tonnes,
            })
            .await
        {
            tracing::warn!(
                "Failed to create certificate record for order {}: {}",
                order.id,
                e
            );
            warnings.push(CheckoutWarning::CertificateCreateFailed(e.to_string()));
        }

        // 7. Best effort: queue the generation request
        if let Err(warning) = self.publish_generation_message(&order).await {
            warnings.push(warning);
        }

        // 8. The order is returned whether or not steps 5-7 succeeded
        Ok(CheckoutOutcome { order, warnings })
    }

    async fn publish_generation_message(&self, order: &Order) -> Result<(), CheckoutWarning> {
        let profile = self.users.profile(order.user_id);
        let message = CertificateGenerationMessage {
            order_id: order.id,
            user_id: order.user_id,
            project_id: order.project_id,
            tonnes: order.tonnes,
            user_email: profile.email,
            user_name: profile.name,
        };

        let payload = serde_json::to_vec(&message)
            .map_err(|e| CheckoutWarning::PublishFailed(e.to_string()))?;

        self.queue
            .publish(&self.queue_name, &payload)
            .await
            .map_err(|e| {
                tracing::warn!(
                    "Failed to publish certificate generation message for order {}: {}",
                    order.id,
                    e
                );
                CheckoutWarning::PublishFailed(e.to_string())
            })
    }
}

/// Payment identifier recorded on the order. Deterministic from the
/// user and the checkout second; no gateway exists to assign a real one.
fn payment_id(user_id: i64) -> String {
    format!("pay_{}_{}", user_id, Utc::now().timestamp())
}
