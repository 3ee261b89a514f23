use async_trait::async_trait;
use tokio::sync::watch;

// ============================================================================
// Messaging
// ============================================================================
//
// Bus contracts and their Redpanda/Kafka adapters:
// - EventPublisher  - best-effort send to a topic
// - MessageBus      - subscribe to a topic within a consumer group
// - MessageStream   - blocking receive that also observes the stop signal
// - EventConsumer   - the single long-lived receive loop
//
// ============================================================================

mod redpanda;
mod subscriber;
mod consumer;

pub use redpanda::RedpandaClient;
pub use subscriber::RedpandaSubscriber;
pub use consumer::{ConsumerError, ConsumerState, EventConsumer, MessageHandler};

/// Set to `true` once the consumer has been asked to stop.
pub type StopSignal = watch::Receiver<bool>;

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("Failed to create Kafka client: {0}")]
    Client(String),

    #[error("Failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Circuit breaker open for message bus")]
    CircuitOpen,

    #[error("Failed to subscribe: {0}")]
    Subscribe(String),

    #[error("Failed to receive message: {0}")]
    Receive(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Message(ReceivedMessage),
    /// The stop signal was observed while waiting.
    Stopped,
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), MessagingError>;
}

#[async_trait]
pub trait MessageStream: Send {
    /// Wait for the next message, or return `Received::Stopped` once `stop`
    /// flips to true.
    async fn next(&mut self, stop: &mut StopSignal) -> Result<Received, MessagingError>;
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
    ) -> Result<Box<dyn MessageStream>, MessagingError>;
}
