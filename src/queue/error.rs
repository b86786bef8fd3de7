/// Error types for queue operations
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue transport error: {0}")]
    Transport(#[from] redis::RedisError),

    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}
