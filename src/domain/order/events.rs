use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::aggregate::Order;

// ============================================================================
// Order Events
// ============================================================================
//
// `order.created` is the only event this service emits. Its JSON shape is
// shared with downstream consumers, so field names are fixed here.
//
// ============================================================================

pub const ORDER_CREATED_TOPIC: &str = "order.created";

/// Base trait for events announced on the bus
pub trait DomainEvent {
    fn event_type(&self) -> &str;
    fn aggregate_id(&self) -> Uuid;
    fn timestamp(&self) -> DateTime<Utc>;
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedEvent {
    pub id: Uuid,
    pub user_email: String,
    pub items: Vec<OrderCreatedItem>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCreatedItem {
    #[serde(rename = "productID")]
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: f64,
}

impl OrderCreatedEvent {
    /// Sum of the item lines, in item order.
    pub fn items_total(&self) -> f64 {
        self.items
            .iter()
            .fold(0.0, |acc, item| acc + item.quantity as f64 * item.price)
    }
}

impl From<&Order> for OrderCreatedEvent {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            user_email: order.user_email().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderCreatedItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.unit_price,
                })
                .collect(),
            total: order.total(),
            created_at: order.created_at(),
        }
    }
}

impl DomainEvent for OrderCreatedEvent {
    fn event_type(&self) -> &str {
        "OrderCreated"
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}
