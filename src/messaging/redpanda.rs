use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use std::time::Duration;

use super::{EventPublisher, MessagingError};
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

/// Kafka/Redpanda producer guarded by a circuit breaker.
pub struct RedpandaClient {
    producer: FutureProducer,
    circuit_breaker: CircuitBreaker,
    send_timeout: Duration,
}

impl RedpandaClient {
    pub fn new(brokers: &str, send_timeout: Duration) -> Result<Self, MessagingError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .create()
            .map_err(|e| MessagingError::Client(e.to_string()))?;

        Ok(Self {
            producer,
            circuit_breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
            send_timeout,
        })
    }
}

#[async_trait]
impl EventPublisher for RedpandaClient {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), MessagingError> {
        let result = self
            .circuit_breaker
            .call(async {
                let record = FutureRecord::to(topic).key(key).payload(payload);

                self.producer
                    .send(record, Timeout::After(self.send_timeout))
                    .await
                    .map(|_| ())
                    .map_err(|(e, _)| e)
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    topic = %topic,
                    key = %key,
                    bytes = payload.len(),
                    "Published to Redpanda"
                );
                Ok(())
            }
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::error!(
                    topic = %topic,
                    "Circuit breaker open - Redpanda unavailable"
                );
                Err(MessagingError::CircuitOpen)
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                tracing::error!(
                    error = %e,
                    topic = %topic,
                    "Failed to publish to Redpanda"
                );
                Err(MessagingError::Publish {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
