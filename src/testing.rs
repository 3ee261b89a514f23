// ============================================================================
// In-memory test doubles for the pricing, store and bus contracts
// ============================================================================

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::order::{Order, OrderCreatedEvent};
use crate::messaging::{
    EventPublisher, MessageBus, MessageStream, MessagingError, Received, ReceivedMessage,
    StopSignal,
};
use crate::pricing::{PricingError, PricingLookup};
use crate::store::{OrderStore, StoreError};

// ----------------------------------------------------------------------------
// Pricing
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePricing {
    prices: HashMap<Uuid, f64>,
    unavailable: HashSet<Uuid>,
    calls: Mutex<Vec<Uuid>>,
}

impl FakePricing {
    pub fn with_price(mut self, product_id: Uuid, price: f64) -> Self {
        self.prices.insert(product_id, price);
        self
    }

    pub fn with_unavailable(mut self, product_id: Uuid) -> Self {
        self.unavailable.insert(product_id);
        self
    }

    pub fn calls(&self) -> Vec<Uuid> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PricingLookup for FakePricing {
    async fn get_unit_price(&self, product_id: Uuid) -> Result<f64, PricingError> {
        self.calls.lock().unwrap().push(product_id);
        if self.unavailable.contains(&product_id) {
            return Err(PricingError::Unavailable("catalog timed out".into()));
        }
        self.prices
            .get(&product_id)
            .copied()
            .ok_or(PricingError::NotFound(product_id))
    }
}

// ----------------------------------------------------------------------------
// Store
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    orders: Mutex<Vec<Order>>,
    create_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl FakeStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderStore for FakeStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.orders.lock().unwrap().push(order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, StoreError> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id() == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_by_user(&self, user_email: &str) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_email() == user_email)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }
}

// ----------------------------------------------------------------------------
// Publisher
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePublisher {
    published: Mutex<Vec<(String, String, Vec<u8>)>>,
    fail: AtomicBool,
}

impl FakePublisher {
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.fail.store(true, Ordering::SeqCst);
        publisher
    }

    /// (topic, key, payload) for every accepted publish.
    pub fn published(&self) -> Vec<(String, String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for FakePublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), MessagingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MessagingError::Publish {
                topic: topic.to_string(),
                reason: "Local: Message timed out".into(),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), key.to_string(), payload.to_vec()));
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Bus
// ----------------------------------------------------------------------------

type Script = VecDeque<Result<Vec<u8>, MessagingError>>;

/// Bus whose single subscription replays a fixed script, then idles until
/// stopped.
pub struct ScriptedBus {
    script: Mutex<Option<Script>>,
    fail_subscribe: bool,
}

impl ScriptedBus {
    pub fn new(script: Vec<Result<Vec<u8>, MessagingError>>) -> Self {
        Self {
            script: Mutex::new(Some(script.into())),
            fail_subscribe: false,
        }
    }

    pub fn failing_subscribe() -> Self {
        Self {
            script: Mutex::new(None),
            fail_subscribe: true,
        }
    }
}

struct ScriptedStream {
    script: Script,
    offset: i64,
}

#[async_trait]
impl MessageBus for ScriptedBus {
    async fn subscribe(
        &self,
        _topic: &str,
        _group_id: &str,
    ) -> Result<Box<dyn MessageStream>, MessagingError> {
        if self.fail_subscribe {
            return Err(MessagingError::Subscribe("unknown topic".into()));
        }
        let script = self.script.lock().unwrap().take().unwrap_or_default();
        Ok(Box::new(ScriptedStream { script, offset: 0 }))
    }
}

#[async_trait]
impl MessageStream for ScriptedStream {
    async fn next(&mut self, stop: &mut StopSignal) -> Result<Received, MessagingError> {
        if *stop.borrow() {
            return Ok(Received::Stopped);
        }

        match self.script.pop_front() {
            Some(Ok(payload)) => {
                self.offset += 1;
                Ok(Received::Message(ReceivedMessage {
                    payload,
                    partition: 0,
                    offset: self.offset,
                }))
            }
            Some(Err(e)) => Err(e),
            None => {
                let _ = stop.changed().await;
                Ok(Received::Stopped)
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// A serialized `order.created` event and its order id.
pub fn event_payload(user_email: &str) -> (Vec<u8>, Uuid) {
    let mut order = Order::create(user_email);
    order.add_item(Uuid::new_v4(), 2, 10.0).unwrap();
    let event = OrderCreatedEvent::from(&order);
    (serde_json::to_vec(&event).unwrap(), order.id())
}

/// Poll `condition` until it holds, panicking after `limit`.
pub async fn wait_until(limit: Duration, condition: impl Fn() -> bool) {
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
