use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{MessageBus, MessageStream, MessagingError, Received, StopSignal};
use crate::metrics::{ConsumerOutcome, Metrics};

// ============================================================================
// Event Consumer - single background receive loop
// ============================================================================
//
// Stopped --start--> Running --stop--> Stopped
//
// Messages are handled one at a time. Every received message counts as
// consumed whatever the handler returns: handler errors are logged, never
// retried or dead-lettered, and never stop the loop. Receive errors are
// logged and the loop carries on. Only `stop` ends it; the stop signal is
// checked at the top of every iteration and while waiting for a message,
// never while a handler is running.
//
// ============================================================================

/// Reacts to one message payload.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Stopped,
    Running,
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Consumer is already running on topic {0}")]
    AlreadyRunning(String),

    #[error(transparent)]
    Subscribe(#[from] MessagingError),
}

struct RunningLoop {
    topic: String,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct EventConsumer {
    metrics: Arc<Metrics>,
    running: Option<RunningLoop>,
}

impl EventConsumer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            running: None,
        }
    }

    pub fn state(&self) -> ConsumerState {
        match &self.running {
            Some(running) if !running.task.is_finished() => ConsumerState::Running,
            _ => ConsumerState::Stopped,
        }
    }

    /// Subscribe to `topic` and spawn the receive loop.
    pub async fn start(
        &mut self,
        bus: &dyn MessageBus,
        topic: &str,
        group_id: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), ConsumerError> {
        if let Some(running) = &self.running {
            if !running.task.is_finished() {
                return Err(ConsumerError::AlreadyRunning(running.topic.clone()));
            }
        }

        let stream = bus.subscribe(topic, group_id).await?;
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(run_loop(
            stream,
            handler,
            stop_rx,
            self.metrics.clone(),
            topic.to_string(),
        ));

        tracing::info!(topic = %topic, group_id = %group_id, "🔄 Event consumer started");

        self.running = Some(RunningLoop {
            topic: topic.to_string(),
            stop_tx,
            task,
        });
        Ok(())
    }

    /// Ask the loop to stop and wait for it to finish its current iteration.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        // Err only means the loop already exited and dropped its receiver.
        let _ = running.stop_tx.send(true);

        if let Err(e) = running.task.await {
            tracing::error!(error = %e, topic = %running.topic, "Event consumer task failed");
        }

        tracing::info!(topic = %running.topic, "Event consumer stopped");
    }
}

async fn run_loop(
    mut stream: Box<dyn MessageStream>,
    handler: Arc<dyn MessageHandler>,
    mut stop: StopSignal,
    metrics: Arc<Metrics>,
    topic: String,
) {
    loop {
        if *stop.borrow() {
            break;
        }

        let message = match stream.next(&mut stop).await {
            Ok(Received::Message(message)) => message,
            Ok(Received::Stopped) => break,
            Err(e) => {
                tracing::error!(error = %e, topic = %topic, "Failed to read message");
                metrics.record_consumer_outcome(ConsumerOutcome::ReceiveError);
                continue;
            }
        };

        if message.payload.is_empty() {
            tracing::warn!(
                topic = %topic,
                partition = message.partition,
                offset = message.offset,
                "Skipping message without payload"
            );
            metrics.record_consumer_outcome(ConsumerOutcome::Empty);
            continue;
        }

        tracing::debug!(
            topic = %topic,
            partition = message.partition,
            offset = message.offset,
            bytes = message.payload.len(),
            "Received message"
        );

        match handler.handle(&message.payload).await {
            Ok(()) => metrics.record_consumer_outcome(ConsumerOutcome::Handled),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    topic = %topic,
                    partition = message.partition,
                    offset = message.offset,
                    "Failed to process message"
                );
                metrics.record_consumer_outcome(ConsumerOutcome::HandlerError);
            }
        }
    }

    tracing::info!(topic = %topic, "Stop requested, leaving consume loop");
}

// ============================================================================
// Unit Tests
// ============================================================================
