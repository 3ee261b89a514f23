// Private module declaration
mod server;

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Covers:
// - Order creation (successes, failures by reason, latency)
// - order.created publishing (best effort, so failures are only counted)
// - Consumer loop outcomes
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Order creation
    pub orders_created: IntCounter,
    pub order_create_failures: IntCounterVec,
    pub order_create_duration: Histogram,

    // Publishing
    pub events_published: IntCounter,
    pub event_publish_failures: IntCounter,

    // Consumer
    pub consumer_messages: IntCounterVec,
}

/// Why a `create_order` call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateFailure {
    Validation,
    Pricing,
    Persistence,
}

impl CreateFailure {
    fn label(self) -> &'static str {
        match self {
            CreateFailure::Validation => "validation",
            CreateFailure::Pricing => "pricing",
            CreateFailure::Persistence => "persistence",
        }
    }
}

/// What happened to one iteration of the consumer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerOutcome {
    Handled,
    HandlerError,
    ReceiveError,
    Empty,
}

impl ConsumerOutcome {
    fn label(self) -> &'static str {
        match self {
            ConsumerOutcome::Handled => "handled",
            ConsumerOutcome::HandlerError => "handler_error",
            ConsumerOutcome::ReceiveError => "receive_error",
            ConsumerOutcome::Empty => "empty",
        }
    }
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders persisted")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_create_failures = IntCounterVec::new(
            Opts::new("order_create_failures_total", "Order creations rejected before commit"),
            &["reason"],
        )?;
        registry.register(Box::new(order_create_failures.clone()))?;

        let order_create_duration = Histogram::with_opts(
            HistogramOpts::new("order_create_duration_seconds", "End-to-end order creation duration")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(order_create_duration.clone()))?;

        let events_published = IntCounter::new(
            "order_events_published_total",
            "order.created events accepted by the broker",
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let event_publish_failures = IntCounter::new(
            "order_event_publish_failures_total",
            "order.created events that could not be published (order still committed)",
        )?;
        registry.register(Box::new(event_publish_failures.clone()))?;

        let consumer_messages = IntCounterVec::new(
            Opts::new("consumer_messages_total", "Consumer loop iterations by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(consumer_messages.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_create_failures,
            order_create_duration,
            events_published,
            event_publish_failures,
            consumer_messages,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_create_failure(&self, failure: CreateFailure) {
        self.order_create_failures.with_label_values(&[failure.label()]).inc();
    }

    pub fn record_publish(&self, success: bool) {
        if success {
            self.events_published.inc();
        } else {
            self.event_publish_failures.inc();
        }
    }

    pub fn record_consumer_outcome(&self, outcome: ConsumerOutcome) {
        self.consumer_messages.with_label_values(&[outcome.label()]).inc();
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        use prometheus::{Encoder, TextEncoder};

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
