use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{
    DomainEvent, Order, OrderCreatedEvent, OrderError, OrderLine, ORDER_CREATED_TOPIC,
};
use crate::messaging::{EventPublisher, MessageHandler};
use crate::metrics::{CreateFailure, Metrics};
use crate::pricing::{PricingError, PricingLookup};
use crate::store::{OrderStore, StoreError};

// ============================================================================
// Order Service
// ============================================================================
//
// Orchestrates: Lines → Pricing → Aggregate → Store → Publish
//
// Everything before the store write is all-or-nothing: a bad line or a
// failed price lookup aborts with nothing written. Once the store has
// committed, the order exists; the publish that follows is best effort and
// its failure is only logged.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderServiceError {
    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error(transparent)]
    Invalid(#[from] OrderError),

    #[error("Pricing unavailable for product {product_id}: {source}")]
    PricingUnavailable {
        product_id: Uuid,
        #[source]
        source: PricingError,
    },

    #[error("Failed to persist order: {0}")]
    Persistence(#[source] StoreError),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Failed to decode order.created event: {0}")]
    Decode(#[from] serde_json::Error),
}

impl OrderServiceError {
    /// True for rejections caused by the request itself.
    pub fn is_validation(&self) -> bool {
        matches!(self, OrderServiceError::EmptyOrder | OrderServiceError::Invalid(_))
    }
}

impl From<StoreError> for OrderServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => OrderServiceError::NotFound(id),
            other => OrderServiceError::Persistence(other),
        }
    }
}

pub struct OrderService {
    pricing: Arc<dyn PricingLookup>,
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    topic: String,
}

impl OrderService {
    pub fn new(
        pricing: Arc<dyn PricingLookup>,
        store: Arc<dyn OrderStore>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            pricing,
            store,
            publisher,
            metrics,
            topic: ORDER_CREATED_TOPIC.to_string(),
        }
    }

    /// Publish creation events to `topic` instead of `order.created`.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Price, persist and announce a new order for `user_email`.
    pub async fn create_order(
        &self,
        user_email: &str,
        lines: &[OrderLine],
    ) -> Result<Order, OrderServiceError> {
        let _timer = self.metrics.order_create_duration.start_timer();

        let result = self.build_and_persist(user_email, lines).await;
        let order = match result {
            Ok(order) => order,
            Err(e) => {
                let failure = match &e {
                    OrderServiceError::PricingUnavailable { .. } => CreateFailure::Pricing,
                    OrderServiceError::Persistence(_) => CreateFailure::Persistence,
                    _ => CreateFailure::Validation,
                };
                self.metrics.record_create_failure(failure);
                tracing::warn!(
                    user_email = %user_email,
                    line_count = lines.len(),
                    error = %e,
                    "Order creation rejected"
                );
                return Err(e);
            }
        };

        self.metrics.orders_created.inc();
        tracing::info!(
            order_id = %order.id(),
            user_email = %order.user_email(),
            item_count = order.items().len(),
            total = order.total(),
            "✅ Order created"
        );

        self.announce(&order).await;

        Ok(order)
    }

    async fn build_and_persist(
        &self,
        user_email: &str,
        lines: &[OrderLine],
    ) -> Result<Order, OrderServiceError> {
        if lines.is_empty() {
            return Err(OrderServiceError::EmptyOrder);
        }

        // Reject bad quantities before spending any catalog round trips.
        if let Some(line) = lines.iter().find(|line| line.quantity <= 0) {
            return Err(OrderError::InvalidQuantity(line.quantity).into());
        }

        let mut prices = Vec::with_capacity(lines.len());
        for line in lines {
            let price = self
                .pricing
                .get_unit_price(line.product_id)
                .await
                .map_err(|source| OrderServiceError::PricingUnavailable {
                    product_id: line.product_id,
                    source,
                })?;
            prices.push(price);
        }

        let mut order = Order::create(user_email);
        for (line, price) in lines.iter().zip(prices) {
            order.add_item(line.product_id, line.quantity, price)?;
        }

        self.store
            .create(&order)
            .await
            .map_err(OrderServiceError::Persistence)?;

        Ok(order)
    }

    /// Best-effort `order.created` publish. The order is already committed,
    /// so failures are logged and counted but never returned.
    async fn announce(&self, order: &Order) {
        let event = OrderCreatedEvent::from(order);

        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics.record_publish(false);
                tracing::warn!(
                    order_id = %order.id(),
                    error = %e,
                    "Failed to serialize order created event"
                );
                return;
            }
        };

        let key = event.aggregate_id().to_string();
        match self.publisher.publish(&self.topic, &key, &payload).await {
            Ok(()) => {
                self.metrics.record_publish(true);
                tracing::debug!(
                    order_id = %order.id(),
                    topic = %self.topic,
                    event_type = %event.event_type(),
                    "Published order created event"
                );
            }
            Err(e) => {
                self.metrics.record_publish(false);
                tracing::warn!(
                    order_id = %order.id(),
                    topic = %self.topic,
                    error = %e,
                    "Failed to produce order created event; order is committed"
                );
            }
        }
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, OrderServiceError> {
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn get_orders_by_user(&self, user_email: &str) -> Result<Vec<Order>, OrderServiceError> {
        Ok(self.store.find_by_user(user_email).await?)
    }

    /// Handler for `order.created` messages coming back off the bus.
    pub fn process_order_created(&self, payload: &[u8]) -> Result<OrderCreatedEvent, OrderServiceError> {
        let event: OrderCreatedEvent = serde_json::from_slice(payload)?;

        let items_total = event.items_total();
        if (items_total - event.total).abs() > 1e-6 {
            tracing::warn!(
                order_id = %event.id,
                total = event.total,
                items_total = items_total,
                "order.created total disagrees with its items"
            );
        }

        tracing::info!(
            order_id = %event.id,
            user_email = %event.user_email,
            item_count = event.items.len(),
            total = event.total,
            "Created order for user"
        );

        Ok(event)
    }
}

#[async_trait]
impl MessageHandler for OrderService {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<()> {
        self.process_order_created(payload)?;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
