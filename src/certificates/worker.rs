use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use crate::certificates::{
    CertificateError, CertificateGenerationMessage, CertificateStore,
};
use crate::orders::OrderStore;
use crate::queue::{Delivery, MessageQueue};

/// How long `receive` blocks before the loop re-checks the shutdown
/// signal.
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a queue transport error before retrying, so a dead broker
/// does not turn the loop into a busy spin.
const RECEIVE_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Queue consumer that turns generation messages into certificate URLs.
///
/// One message is processed at a time, including the simulated render
/// delay, so throughput is bounded by 1/delay per consumer. The URL is a
/// deterministic function of the order id, so running more consumers (or
/// re-running a message) produces the same result.
///
/// The certificate and order updates are independent writes to different
/// stores. If the first succeeds and the second fails the two records
/// diverge until the hourly reconciliation repairs them; `generate`
/// surfaces that failure instead of hiding it.
pub struct CertificateWorker<X, O, Q> {
    certificates: X,
    orders: O,
    queue: Q,
    queue_name: String,
    render_delay: Duration,
}

impl<X, O, Q> CertificateWorker<X, O, Q>
where
    X: CertificateStore,
    O: OrderStore,
    Q: MessageQueue,
{
    pub fn new(
        certificates: X,
        orders: O,
        queue: Q,
        queue_name: String,
        render_delay: Duration,
    ) -> Self {
        Self {
            certificates,
            orders,
            queue,
            queue_name,
            render_delay,
        }
    }

    /// The certificate URL for an order. Same order id, same URL —
    /// re-running generation is idempotent.
    pub fn certificate_url(order_id: Uuid) -> String {
        format!("https://certificates.carbonclear.com/cert_{}.pdf", order_id)
    }

    /// Consume the queue until the shutdown signal flips. An in-flight
    /// message always finishes processing before the loop exits; only
    /// the idle wait is interrupted.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Certificate consumer started on queue {}", self.queue_name);

        // Sweep back anything a previous consumer pulled but never acked
        match self.queue.recover(&self.queue_name).await {
            Ok(0) => {}
            Ok(moved) => tracing::info!(
                "Requeued {} parked messages on {}",
                moved,
                self.queue_name
            ),
            Err(e) => tracing::error!("Failed to recover parked messages: {}", e),
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = self.queue.receive(&self.queue_name, RECEIVE_TIMEOUT) => {
                    match received {
                        Ok(Some(delivery)) => self.handle_delivery(delivery).await,
                        Ok(None) => {}
                        Err(e) => {
                            tracing::error!("Failed to receive from queue: {}", e);
                            tokio::time::sleep(RECEIVE_RETRY_BACKOFF).await;
                        }
                    }
                }
            }
        }

        tracing::info!("Certificate consumer stopped");
    }

    /// Decode and process one delivery, then ack on success or move it
    /// to the dead-letter list on any failure.
    pub async fn handle_delivery(&self, delivery: Delivery) {
        let message: CertificateGenerationMessage =
            match serde_json::from_slice(&delivery.payload) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("Failed to decode certificate message: {}", e);
                    self.dead_letter(&delivery).await;
                    return;
                }
            };

        match self.generate(&message).await {
            Ok(()) => {
                if let Err(e) = self.queue.ack(&delivery).await {
                    tracing::error!("Failed to ack certificate message: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to generate certificate for order {}: {}",
                    message.order_id,
                    e
                );
                self.dead_letter(&delivery).await;
            }
        }
    }

    /// Render the certificate and record its URL on both the certificate
    /// and the order.
    pub async fn generate(
        &self,
        message: &CertificateGenerationMessage,
    ) -> Result<(), CertificateError> {
        tracing::info!("Generating certificate for order {}", message.order_id);

        // Stands in for real document rendering and upload
        tokio::time::sleep(self.render_delay).await;

        let url = Self::certificate_url(message.order_id);

        self.certificates
            .update_url_by_order(message.order_id, &url)
            .await?;

        self.orders
            .update_certificate_url(message.order_id, &url)
            .await
            .map_err(|e| CertificateError::OrderUpdateFailed(e.to_string()))?;

        self.notify_user(message, &url);

        tracing::info!(
            "Certificate generated successfully for order {}",
            message.order_id
        );
        Ok(())
    }

    /// Email delivery is out of scope for this service; a real
    /// implementation would hand the URL to a mail provider here.
    fn notify_user(&self, message: &CertificateGenerationMessage, url: &str) {
        tracing::info!(
            "Mock certificate email to {} ({}) with URL {}",
            message.user_email,
            message.user_name,
            url
        );
    }

    async fn dead_letter(&self, delivery: &Delivery) {
        if let Err(e) = self.queue.reject(delivery).await {
            tracing::error!("Failed to dead-letter certificate message: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::CertificateStatus;
    use crate::queue::{InMemoryQueue, CERTIFICATE_QUEUE};
    use crate::testing::{InMemoryCertificateStore, InMemoryOrderStore, TestData};
    use rust_decimal_macros::dec;

    fn worker(
        certificates: InMemoryCertificateStore,
        orders: InMemoryOrderStore,
        queue: InMemoryQueue,
    ) -> CertificateWorker<InMemoryCertificateStore, InMemoryOrderStore, InMemoryQueue> {
        CertificateWorker::new(
            certificates,
            orders,
            queue,
            CERTIFICATE_QUEUE.to_string(),
            Duration::from_millis(0),
        )
    }

    fn message_for(order_id: Uuid) -> CertificateGenerationMessage {
        CertificateGenerationMessage {
            order_id,
            user_id: 1,
            project_id: 10,
            tonnes: dec!(5),
            user_email: "user@example.com".to_string(),
            user_name: "User Name".to_string(),
        }
    }

    #[test]
    fn test_certificate_url_is_deterministic() {
        let order_id = Uuid::new_v4();
        let first = CertificateWorker::<
            InMemoryCertificateStore,
            InMemoryOrderStore,
            InMemoryQueue,
        >::certificate_url(order_id);
        let second = CertificateWorker::<
            InMemoryCertificateStore,
            InMemoryOrderStore,
            InMemoryQueue,
        >::certificate_url(order_id);
        assert_eq!(first, second);
        assert!(first.contains(&order_id.to_string()));
    }

    #[tokio::test]
    async fn test_generate_updates_certificate_and_order() {
        let data = TestData::new();
        let order = data.completed_order(1, 10, dec!(5)).await;
        data.pending_certificate(&order).await;

        let worker = worker(data.certificates.clone(), data.orders.clone(), InMemoryQueue::new());
        worker.generate(&message_for(order.id)).await.unwrap();

        let cert = data
            .certificates
            .get_by_order_id(order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cert.status, CertificateStatus::Generated);
        assert!(!cert.certificate_url.is_empty());

        let order = data.orders.get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.certificate_url, cert.certificate_url);
    }

    #[tokio::test]
    async fn test_generate_twice_yields_same_url() {
        let data = TestData::new();
        let order = data.completed_order(1, 10, dec!(5)).await;
        data.pending_certificate(&order).await;

        let worker = worker(data.certificates.clone(), data.orders.clone(), InMemoryQueue::new());
        let message = message_for(order.id);

        worker.generate(&message).await.unwrap();
        let first = data
            .certificates
            .get_by_order_id(order.id)
            .await
            .unwrap()
            .unwrap()
            .certificate_url;

        worker.generate(&message).await.unwrap();
        let second = data
            .certificates
            .get_by_order_id(order.id)
            .await
            .unwrap()
            .unwrap()
            .certificate_url;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_order_update_failure_leaves_divergence_visible() {
        let data = TestData::new();
        let order = data.completed_order(1, 10, dec!(5)).await;
        data.pending_certificate(&order).await;
        data.orders.fail_certificate_url_updates();

        let worker = worker(data.certificates.clone(), data.orders.clone(), InMemoryQueue::new());
        let result = worker.generate(&message_for(order.id)).await;
        assert!(matches!(result, Err(CertificateError::OrderUpdateFailed(_))));

        // Certificate moved to generated but the order never got the URL:
        // exactly the divergence reconciliation must detect by order id
        let cert = data
            .certificates
            .get_by_order_id(order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cert.status, CertificateStatus::Generated);

        let order = data.orders.get_by_id(order.id).await.unwrap().unwrap();
        assert!(order.certificate_url.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_message_is_dead_lettered() {
        let data = TestData::new();
        let queue = InMemoryQueue::new();
        queue
            .publish(CERTIFICATE_QUEUE, b"not json")
            .await
            .unwrap();

        let worker = worker(data.certificates.clone(), data.orders.clone(), queue.clone());
        let delivery = queue
            .receive(CERTIFICATE_QUEUE, Duration::from_millis(10))
            .await
            .unwrap()
            .expect("message expected");
        worker.handle_delivery(delivery).await;

        assert_eq!(queue.dead_letters(CERTIFICATE_QUEUE).len(), 1);
        assert_eq!(queue.processing_len(CERTIFICATE_QUEUE), 0);
    }

    #[tokio::test]
    async fn test_run_requeues_parked_message_and_processes_it() {
        let data = TestData::new();
        let order = data.completed_order(1, 10, dec!(5)).await;
        data.pending_certificate(&order).await;

        let queue = InMemoryQueue::new();
        let payload = serde_json::to_vec(&message_for(order.id)).unwrap();
        queue.publish(CERTIFICATE_QUEUE, &payload).await.unwrap();

        // A previous consumer pulled the message and died before acking
        queue
            .receive(CERTIFICATE_QUEUE, Duration::from_millis(10))
            .await
            .unwrap()
            .expect("message expected");
        assert_eq!(queue.processing_len(CERTIFICATE_QUEUE), 1);
        assert_eq!(queue.ready_len(CERTIFICATE_QUEUE), 0);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = worker(data.certificates.clone(), data.orders.clone(), queue.clone());
        let handle = tokio::spawn(worker.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(queue.processing_len(CERTIFICATE_QUEUE), 0);
        let cert = data
            .certificates
            .get_by_order_id(order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cert.status, CertificateStatus::Generated);
    }

    #[tokio::test]
    async fn test_successful_delivery_is_acked() {
        let data = TestData::new();
        let order = data.completed_order(1, 10, dec!(5)).await;
        data.pending_certificate(&order).await;

        let queue = InMemoryQueue::new();
        let payload = serde_json::to_vec(&message_for(order.id)).unwrap();
        queue.publish(CERTIFICATE_QUEUE, &payload).await.unwrap();

        let worker = worker(data.certificates.clone(), data.orders.clone(), queue.clone());
        let delivery = queue
            .receive(CERTIFICATE_QUEUE, Duration::from_millis(10))
            .await
            .unwrap()
            .expect("message expected");
        worker.handle_delivery(delivery).await;

        assert_eq!(queue.processing_len(CERTIFICATE_QUEUE), 0);
        assert!(queue.dead_letters(CERTIFICATE_QUEUE).is_empty());
    }
}
