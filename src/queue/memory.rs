use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::queue::{Delivery, MessageQueue, QueueError};

#[derive(Default)]
struct QueueState {
    ready: HashMap<String, VecDeque<Vec<u8>>>,
    processing: HashMap<String, Vec<Vec<u8>>>,
    dead: HashMap<String, Vec<Vec<u8>>>,
}

/// In-memory queue with the same ack/reject semantics as `RedisQueue`.
/// Used by unit tests and handy for running the service without Redis.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<Mutex<QueueState>>,
    fail_publish: Arc<AtomicBool>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail, for exercising best-effort
    /// publish paths.
    pub fn fail_publishes(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    /// Number of messages waiting on a queue.
    pub fn ready_len(&self, queue: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.ready.get(queue).map_or(0, VecDeque::len)
    }

    /// Messages received but neither acked nor rejected.
    pub fn processing_len(&self, queue: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.processing.get(queue).map_or(0, Vec::len)
    }

    /// Dead-lettered payloads for a queue.
    pub fn dead_letters(&self, queue: &str) -> Vec<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.dead.get(queue).cloned().unwrap_or_default()
    }
}

impl MessageQueue for InMemoryQueue {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), QueueError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("publish disabled".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        state
            .ready
            .entry(queue.to_string())
            .or_default()
            .push_front(payload.to_vec());
        Ok(())
    }

    async fn receive(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<Delivery>, QueueError> {
        let popped = {
            let mut state = self.state.lock().unwrap();
            let popped = state
                .ready
                .get_mut(queue)
                .and_then(VecDeque::pop_back);
            if let Some(payload) = &popped {
                state
                    .processing
                    .entry(queue.to_string())
                    .or_default()
                    .push(payload.clone());
            }
            popped
        };

        match popped {
            Some(payload) => Ok(Some(Delivery {
                queue: queue.to_string(),
                payload,
            })),
            None => {
                // Emulate the blocking wait without holding the lock
                tokio::time::sleep(timeout.min(Duration::from_millis(10))).await;
                Ok(None)
            }
        }
    }

    async fn recover(&self, queue: &str) -> Result<u64, QueueError> {
        let mut state = self.state.lock().unwrap();
        let parked = state.processing.remove(queue).unwrap_or_default();
        let moved = parked.len() as u64;

        // Oldest parked message ends at the consumable end
        let ready = state.ready.entry(queue.to_string()).or_default();
        for payload in parked.into_iter().rev() {
            ready.push_back(payload);
        }

        Ok(moved)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        if let Some(processing) = state.processing.get_mut(&delivery.queue) {
            if let Some(pos) = processing.iter().position(|p| *p == delivery.payload) {
                processing.remove(pos);
            }
        }
        Ok(())
    }

    async fn reject(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        if let Some(processing) = state.processing.get_mut(&delivery.queue) {
            if let Some(pos) = processing.iter().position(|p| *p == delivery.payload) {
                processing.remove(pos);
            }
        }
        state
            .dead
            .entry(delivery.queue.clone())
            .or_default()
            .push(delivery.payload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_receive_ack_cycle() {
        let queue = InMemoryQueue::new();
        queue.publish("q", b"one").await.unwrap();
        queue.publish("q", b"two").await.unwrap();

        let delivery = queue
            .receive("q", Duration::from_millis(10))
            .await
            .unwrap()
            .expect("message expected");
        assert_eq!(delivery.payload, b"one");
        assert_eq!(queue.processing_len("q"), 1);

        queue.ack(&delivery).await.unwrap();
        assert_eq!(queue.processing_len("q"), 0);
        assert_eq!(queue.ready_len("q"), 1);
    }

    #[tokio::test]
    async fn test_reject_moves_to_dead_letters() {
        let queue = InMemoryQueue::new();
        queue.publish("q", b"bad").await.unwrap();

        let delivery = queue
            .receive("q", Duration::from_millis(10))
            .await
            .unwrap()
            .expect("message expected");
        queue.reject(&delivery).await.unwrap();

        assert_eq!(queue.processing_len("q"), 0);
        assert_eq!(queue.dead_letters("q"), vec![b"bad".to_vec()]);
    }

    #[tokio::test]
    async fn test_recover_requeues_parked_messages_oldest_first() {
        let queue = InMemoryQueue::new();
        queue.publish("q", b"one").await.unwrap();
        queue.publish("q", b"two").await.unwrap();

        // A consumer pulled both and died before acking either
        queue.receive("q", Duration::from_millis(10)).await.unwrap();
        queue.receive("q", Duration::from_millis(10)).await.unwrap();
        assert_eq!(queue.processing_len("q"), 2);
        assert_eq!(queue.ready_len("q"), 0);

        let moved = queue.recover("q").await.unwrap();
        assert_eq!(moved, 2);
        assert_eq!(queue.processing_len("q"), 0);

        let first = queue
            .receive("q", Duration::from_millis(10))
            .await
            .unwrap()
            .expect("message expected");
        assert_eq!(first.payload, b"one");
    }

    #[tokio::test]
    async fn test_recover_on_clean_queue_moves_nothing() {
        let queue = InMemoryQueue::new();
        queue.publish("q", b"msg").await.unwrap();
        assert_eq!(queue.recover("q").await.unwrap(), 0);
        assert_eq!(queue.ready_len("q"), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let queue = InMemoryQueue::new();
        let result = queue.receive("q", Duration::from_millis(1)).await.unwrap();
        assert!(result.is_none());
    }
}
