// In-memory store fakes for service, worker, and scheduler tests.
//
// Each fake honors its trait's documented semantics (merge-on-add,
// inclusive date ranges, URL updates keyed by order id) and carries
// failure switches so tests can force individual operations to error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cart::{CartError, CartLine, CartStore};
use crate::certificates::{
    Certificate, CertificateError, CertificateStatus, CertificateStore, NewCertificate,
};
use crate::orders::{NewOrder, Order, OrderError, OrderStatus, OrderStore};

#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    lines: Arc<Mutex<Vec<CartLine>>>,
    fail_clears: Arc<AtomicBool>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `clear` fail.
    pub fn fail_clears(&self) {
        self.fail_clears.store(true, Ordering::SeqCst);
    }
}

impl CartStore for InMemoryCartStore {
    async fn add_to_cart(
        &self,
        user_id: i64,
        project_id: i64,
        tonnes: Decimal,
    ) -> Result<CartLine, CartError> {
        let mut lines = self.lines.lock().unwrap();
        if let Some(line) = lines
            .iter_mut()
            .find(|l| l.user_id == user_id && l.project_id == project_id)
        {
            line.tonnes += tonnes;
            line.updated_at = Utc::now();
            return Ok(line.clone());
        }

        let line = CartLine {
            id: Uuid::new_v4(),
            user_id,
            project_id,
            tonnes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        lines.push(line.clone());
        Ok(line)
    }

    async fn get_cart(&self, user_id: i64) -> Result<Vec<CartLine>, CartError> {
        let lines = self.lines.lock().unwrap();
        Ok(lines
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
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

        let mut lines = self.lines.lock().unwrap();
        if let Some(line) = lines
            .iter_mut()
            .find(|l| l.user_id == user_id && l.project_id == project_id)
        {
            line.tonnes = tonnes;
            line.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn remove_item(&self, user_id: i64, project_id: i64) -> Result<(), CartError> {
        let mut lines = self.lines.lock().unwrap();
        lines.retain(|l| !(l.user_id == user_id && l.project_id == project_id));
        Ok(())
    }

    async fn clear(&self, user_id: i64) -> Result<(), CartError> {
        if self.fail_clears.load(Ordering::SeqCst) {
            return Err(CartError::DatabaseError("injected clear failure".to_string()));
        }
        let mut lines = self.lines.lock().unwrap();
        lines.retain(|l| l.user_id != user_id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<Mutex<Vec<Order>>>,
    fail_creates: Arc<AtomicBool>,
    fail_status_updates: Arc<AtomicBool>,
    fail_certificate_url_updates: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored order, in insertion order.
    pub fn all(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    /// Insert a fully built order, bypassing `create`.
    pub fn insert(&self, order: Order) {
        self.orders.lock().unwrap().push(order);
    }

    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    pub fn fail_status_updates(&self) {
        self.fail_status_updates.store(true, Ordering::SeqCst);
    }

    pub fn fail_certificate_url_updates(&self) {
        self.fail_certificate_url_updates.store(true, Ordering::SeqCst);
    }
}

impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, OrderError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(OrderError::DatabaseError(
                "injected create failure".to_string(),
            ));
        }

        let order = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            project_id: order.project_id,
            tonnes: order.tonnes,
            price_per_tonne: order.price_per_tonne,
            total_amount: order.total_amount,
            status: order.status,
            payment_id: order.payment_id,
            certificate_url: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.orders.lock().unwrap().push(order.clone());
        Ok(order)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Order>, OrderError> {
        let orders = self.orders.lock().unwrap();
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<(), OrderError> {
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(OrderError::DatabaseError(
                "injected status update failure".to_string(),
            ));
        }

        let mut orders = self.orders.lock().unwrap();
        match orders.iter_mut().find(|o| o.id == id) {
            Some(order) => {
                order.status = status;
                order.updated_at = Utc::now();
                Ok(())
            }
            None => Err(OrderError::NotFound),
        }
    }

    async fn update_certificate_url(&self, id: Uuid, url: &str) -> Result<(), OrderError> {
        if self.fail_certificate_url_updates.load(Ordering::SeqCst) {
            return Err(OrderError::DatabaseError(
                "injected certificate url update failure".to_string(),
            ));
        }

        let mut orders = self.orders.lock().unwrap();
        match orders.iter_mut().find(|o| o.id == id) {
            Some(order) => {
                order.certificate_url = url.to_string();
                order.updated_at = Utc::now();
                Ok(())
            }
            None => Err(OrderError::NotFound),
        }
    }

    async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .filter(|o| o.created_at >= start && o.created_at <= end)
            .cloned()
            .collect())
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending && o.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn find_completed_missing_certificate_url(&self) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .filter(|o| o.status == OrderStatus::Completed && o.certificate_url.is_empty())
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCertificateStore {
    certificates: Arc<Mutex<Vec<Certificate>>>,
    fail_creates: Arc<AtomicBool>,
}

impl InMemoryCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully built certificate, bypassing `create`.
    pub fn insert(&self, certificate: Certificate) {
        self.certificates.lock().unwrap().push(certificate);
    }

    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }
}

impl CertificateStore for InMemoryCertificateStore {
    async fn create(&self, certificate: NewCertificate) -> Result<Certificate, CertificateError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(CertificateError::DatabaseError(
                "injected create failure".to_string(),
            ));
        }

        let certificate = Certificate {
            id: Uuid::new_v4(),
            order_id: certificate.order_id,
            user_id: certificate.user_id,
            project_id: certificate.project_id,
            tonnes: certificate.tonnes,
            certificate_url: String::new(),
            status: CertificateStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.certificates.lock().unwrap().push(certificate.clone());
        Ok(certificate)
    }

    async fn get_by_order_id(
        &self,
        order_id: Uuid,
    ) -> Result<Option<Certificate>, CertificateError> {
        let certificates = self.certificates.lock().unwrap();
        Ok(certificates.iter().find(|c| c.order_id == order_id).cloned())
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Certificate>, CertificateError> {
        let certificates = self.certificates.lock().unwrap();
        Ok(certificates
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CertificateStatus,
    ) -> Result<(), CertificateError> {
        let mut certificates = self.certificates.lock().unwrap();
        if let Some(certificate) = certificates.iter_mut().find(|c| c.id == id) {
            certificate.status = status;
            certificate.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_url_by_order(&self, order_id: Uuid, url: &str) -> Result<(), CertificateError> {
        let mut certificates = self.certificates.lock().unwrap();
        match certificates.iter_mut().find(|c| c.order_id == order_id) {
            Some(certificate) => {
                certificate.certificate_url = url.to_string();
                certificate.status = CertificateStatus::Generated;
                certificate.updated_at = Utc::now();
                Ok(())
            }
            None => Err(CertificateError::NotFoundForOrder(order_id)),
        }
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Certificate>, CertificateError> {
        let certificates = self.certificates.lock().unwrap();
        Ok(certificates
            .iter()
            .filter(|c| c.status == CertificateStatus::Pending && c.created_at < cutoff)
            .cloned()
            .collect())
    }
}

/// One set of fakes plus builders for common fixtures.
pub struct TestData {
    pub carts: InMemoryCartStore,
    pub orders: InMemoryOrderStore,
    pub certificates: InMemoryCertificateStore,
}

impl TestData {
    pub fn new() -> Self {
        Self {
            carts: InMemoryCartStore::new(),
            orders: InMemoryOrderStore::new(),
            certificates: InMemoryCertificateStore::new(),
        }
    }

    fn build_order(
        user_id: i64,
        project_id: i64,
        tonnes: Decimal,
        status: OrderStatus,
        created_at: DateTime<Utc>,
    ) -> Order {
        let price_per_tonne = Decimal::from(50);
        Order {
            id: Uuid::new_v4(),
            user_id,
            project_id,
            tonnes,
            price_per_tonne,
            total_amount: tonnes * price_per_tonne,
            status,
            payment_id: format!("pay_{}_{}", user_id, created_at.timestamp()),
            certificate_url: String::new(),
            created_at,
            updated_at: created_at,
        }
    }

    pub async fn completed_order(&self, user_id: i64, project_id: i64, tonnes: Decimal) -> Order {
        self.completed_order_at(user_id, project_id, tonnes, Utc::now())
            .await
    }

    pub async fn completed_order_at(
        &self,
        user_id: i64,
        project_id: i64,
        tonnes: Decimal,
        created_at: DateTime<Utc>,
    ) -> Order {
        let order = Self::build_order(user_id, project_id, tonnes, OrderStatus::Completed, created_at);
        self.orders.insert(order.clone());
        order
    }

    pub async fn pending_order_at(
        &self,
        user_id: i64,
        project_id: i64,
        tonnes: Decimal,
        created_at: DateTime<Utc>,
    ) -> Order {
        let order = Self::build_order(user_id, project_id, tonnes, OrderStatus::Pending, created_at);
        self.orders.insert(order.clone());
        order
    }

    pub async fn pending_certificate(&self, order: &Order) -> Certificate {
        self.pending_certificate_at(order, Utc::now()).await
    }

    pub async fn pending_certificate_at(
        &self,
        order: &Order,
        created_at: DateTime<Utc>,
    ) -> Certificate {
        let certificate = Certificate {
            id: Uuid::new_v4(),
            order_id: order.id,
            user_id: order.user_id,
            project_id: order.project_id,
            tonnes: order.tonnes,
            certificate_url: String::new(),
            status: CertificateStatus::Pending,
            created_at,
            updated_at: created_at,
        };
        self.certificates.insert(certificate.clone());
        certificate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_cart_fake_merges_adds() {
        let carts = InMemoryCartStore::new();
        carts.add_to_cart(1, 10, dec!(3)).await.unwrap();
        let line = carts.add_to_cart(1, 10, dec!(2)).await.unwrap();
        assert_eq!(line.tonnes, dec!(5));
        assert_eq!(carts.get_cart(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_fake_update_to_zero_removes() {
        let carts = InMemoryCartStore::new();
        carts.add_to_cart(1, 10, dec!(3)).await.unwrap();
        carts.update_item(1, 10, dec!(0)).await.unwrap();
        assert!(carts.get_cart(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_fake_date_range_is_inclusive() {
        let data = TestData::new();
        let at = Utc::now();
        data.completed_order_at(1, 10, dec!(1), at).await;

        let found = data.orders.find_by_date_range(at, at).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
