use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Direction};

use crate::queue::{Delivery, MessageQueue, QueueError};

/// Redis-backed durable queue.
///
/// Messages live in a Redis list per queue name. `receive` moves the
/// oldest message into a `<queue>:processing` list (BLMOVE), so a
/// consumer crash leaves the message parked there instead of losing it;
/// `recover` sweeps parked messages back onto the queue at consumer
/// startup. `ack` removes a message from the processing list; `reject`
/// moves it to `<queue>:dead`.
#[derive(Clone)]
pub struct RedisQueue {
    manager: ConnectionManager,
}

impl RedisQueue {
    /// Connect to Redis and build a reconnecting connection manager.
    pub async fn connect(redis_url: &str) -> Result<Self, QueueError> {
        tracing::debug!("Connecting to Redis queue backend");

        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        tracing::info!("Connected to Redis queue backend");
        Ok(Self { manager })
    }

    fn processing_key(queue: &str) -> String {
        format!("{}:processing", queue)
    }

    fn dead_letter_key(queue: &str) -> String {
        format!("{}:dead", queue)
    }
}

impl MessageQueue for RedisQueue {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), QueueError> {
        let mut conn = self.manager.clone();
        conn.lpush::<_, _, ()>(queue, payload).await?;
        Ok(())
    }

    async fn receive(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.manager.clone();
        let payload: Option<Vec<u8>> = conn
            .blmove(
                queue,
                Self::processing_key(queue),
                Direction::Right,
                Direction::Left,
                timeout.as_secs_f64(),
            )
            .await?;

        Ok(payload.map(|payload| Delivery {
            queue: queue.to_string(),
            payload,
        }))
    }

    async fn recover(&self, queue: &str) -> Result<u64, QueueError> {
        let mut conn = self.manager.clone();
        let mut moved = 0;

        // Newest parked entries sit at the head of the processing list;
        // draining head-to-tail onto the consumable end leaves the
        // oldest message next in line.
        loop {
            let payload: Option<Vec<u8>> = conn
                .lmove(
                    Self::processing_key(queue),
                    queue,
                    Direction::Left,
                    Direction::Right,
                )
                .await?;
            if payload.is_none() {
                break;
            }
            moved += 1;
        }

        Ok(moved)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.manager.clone();
        conn.lrem::<_, _, ()>(
            Self::processing_key(&delivery.queue),
            1,
            delivery.payload.as_slice(),
        )
        .await?;
        Ok(())
    }

    async fn reject(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.manager.clone();
        conn.lpush::<_, _, ()>(
            Self::dead_letter_key(&delivery.queue),
            delivery.payload.as_slice(),
        )
        .await?;
        conn.lrem::<_, _, ()>(
            Self::processing_key(&delivery.queue),
            1,
            delivery.payload.as_slice(),
        )
        .await?;
        Ok(())
    }
}
