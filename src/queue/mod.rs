// Durable named-queue abstraction.
//
// Checkout publishes certificate generation requests here and the
// certificate worker drains them. The production implementation rides on
// Redis lists; an in-memory implementation backs the unit tests.

pub mod error;
pub mod memory;
pub mod redis;

pub use error::*;
pub use memory::*;
pub use redis::*;

use std::future::Future;
use std::time::Duration;

/// Default queue name for certificate generation requests.
/// Overridable through CERTIFICATE_QUEUE_NAME.
pub const CERTIFICATE_QUEUE: &str = "certificate_generation";

/// A message pulled off a queue, held until acked or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub queue: String,
    pub payload: Vec<u8>,
}

/// Durable publish/consume over named queues.
///
/// Consumers must call `ack` only after processing succeeds; `reject`
/// moves the message to the queue's dead-letter list instead of dropping
/// it. Publishing is fire-and-forget: no delivery confirmation is awaited.
pub trait MessageQueue: Clone + Send + Sync + 'static {
    /// Append a message to the named queue.
    fn publish(
        &self,
        queue: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Pull the oldest message, waiting up to `timeout`. Returns
    /// `Ok(None)` when the queue stayed empty, so callers can re-check
    /// their shutdown signal between waits.
    fn receive(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Delivery>, QueueError>> + Send;

    /// Move messages parked in the processing list back onto the queue.
    /// A consumer that died between `receive` and `ack` leaves its
    /// in-flight messages parked; the next consumer calls this at
    /// startup before draining the queue. Returns how many were moved.
    fn recover(&self, queue: &str) -> impl Future<Output = Result<u64, QueueError>> + Send;

    /// Discard a successfully processed message.
    fn ack(&self, delivery: &Delivery) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Move a failed message to the dead-letter list.
    fn reject(&self, delivery: &Delivery) -> impl Future<Output = Result<(), QueueError>> + Send;
}
