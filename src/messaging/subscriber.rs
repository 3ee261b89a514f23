use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    Message,
};

use super::{MessageBus, MessageStream, MessagingError, Received, ReceivedMessage, StopSignal};

/// Creates group consumers against a Kafka/Redpanda cluster.
pub struct RedpandaSubscriber {
    brokers: String,
}

impl RedpandaSubscriber {
    pub fn new(brokers: &str) -> Self {
        Self {
            brokers: brokers.to_string(),
        }
    }

    fn client_config(&self, group_id: &str) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000");
        config
    }
}

struct RedpandaStream {
    consumer: StreamConsumer,
}

#[async_trait]
impl MessageBus for RedpandaSubscriber {
    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
    ) -> Result<Box<dyn MessageStream>, MessagingError> {
        let consumer: StreamConsumer = self
            .client_config(group_id)
            .create()
            .map_err(|e| MessagingError::Subscribe(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| MessagingError::Subscribe(e.to_string()))?;

        tracing::info!(
            brokers = %self.brokers,
            topic = %topic,
            group_id = %group_id,
            "Subscribed to topic"
        );

        Ok(Box::new(RedpandaStream { consumer }))
    }
}

#[async_trait]
impl MessageStream for RedpandaStream {
    async fn next(&mut self, stop: &mut StopSignal) -> Result<Received, MessagingError> {
        if *stop.borrow() {
            return Ok(Received::Stopped);
        }

        tokio::select! {
            result = self.consumer.recv() => {
                let message = result.map_err(|e| MessagingError::Receive(e.to_string()))?;
                Ok(Received::Message(ReceivedMessage {
                    payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
                    partition: message.partition(),
                    offset: message.offset(),
                }))
            }
            // A dropped sender counts as a stop request too.
            _ = stop.changed() => Ok(Received::Stopped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_uses_group_and_brokers() {
        let subscriber = RedpandaSubscriber::new("kafka:9092");
        let config = subscriber.client_config("orders-group");

        assert_eq!(config.get("bootstrap.servers"), Some("kafka:9092"));
        assert_eq!(config.get("group.id"), Some("orders-group"));
        assert_eq!(config.get("enable.auto.commit"), Some("true"));
    }
}
