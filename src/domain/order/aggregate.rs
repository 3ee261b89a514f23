use uuid::Uuid;
use chrono::{DateTime, SubsecRound, Utc};

use super::errors::OrderError;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// An order is built empty, grown only by `add_item`, persisted once and then
// read back. Fields are private so that `total` always equals the sum of
// `quantity * unit_price` over the items. Timestamps are kept at
// microsecond precision, the resolution Postgres stores.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: f64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: Uuid,
    user_email: String,
    items: Vec<OrderItem>,
    total: f64,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Start a new, empty order for an already authenticated user.
    pub fn create(user_email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_email: user_email.into(),
            items: Vec::new(),
            total: 0.0,
            created_at: now(),
        }
    }

    /// Rebuild an order from persisted state.
    pub fn restore(
        id: Uuid,
        user_email: String,
        items: Vec<OrderItem>,
        total: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_email,
            items,
            total,
            created_at,
        }
    }

    /// Append a priced line and grow the running total.
    ///
    /// The total is accumulated in append order rather than recomputed, so
    /// floating point results match the order the lines were added in.
    pub fn add_item(
        &mut self,
        product_id: Uuid,
        quantity: i32,
        unit_price: f64,
    ) -> Result<&OrderItem, OrderError> {
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity(quantity));
        }
        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(OrderError::InvalidPrice(unit_price));
        }

        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: self.id,
            product_id,
            quantity,
            unit_price,
            created_at: now(),
        };
        self.total += item.line_total();
        self.items.push(item);

        Ok(&self.items[self.items.len() - 1])
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_starts_empty() {
        let order = Order::create("alice@example.com");

        assert_eq!(order.user_email(), "alice@example.com");
        assert!(order.is_empty());
        assert_eq!(order.total(), 0.0);
    }

    #[test]
    fn test_create_generates_distinct_ids() {
        let a = Order::create("alice@example.com");
        let b = Order::create("alice@example.com");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_add_item_accumulates_total() {
        let mut order = Order::create("alice@example.com");
        order.add_item(Uuid::new_v4(), 2, 10.0).unwrap();
        order.add_item(Uuid::new_v4(), 1, 5.0).unwrap();

        assert_eq!(order.items().len(), 2);
        assert_eq!(order.total(), 25.0);
    }

    #[test]
    fn test_add_item_links_back_to_order() {
        let mut order = Order::create("bob@example.com");
        let product_id = Uuid::new_v4();
        let item = order.add_item(product_id, 3, 1.5).unwrap().clone();

        assert_eq!(item.order_id, order.id());
        assert_eq!(item.product_id, product_id);
        assert_eq!(item.quantity, 3);
        assert_eq!(item.unit_price, 1.5);
    }

    #[test]
    fn test_add_item_preserves_input_order() {
        let mut order = Order::create("bob@example.com");
        let products: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for product_id in &products {
            order.add_item(*product_id, 1, 1.0).unwrap();
        }

        let stored: Vec<Uuid> = order.items().iter().map(|i| i.product_id).collect();
        assert_eq!(stored, products);
    }

    #[test]
    fn test_non_positive_quantity_is_rejected_without_side_effects() {
        let mut order = Order::create("alice@example.com");
        order.add_item(Uuid::new_v4(), 1, 4.0).unwrap();

        for quantity in [0, -1, i32::MIN] {
            let result = order.add_item(Uuid::new_v4(), quantity, 10.0);
            assert_eq!(result.unwrap_err(), OrderError::InvalidQuantity(quantity));
        }

        assert_eq!(order.items().len(), 1);
        assert_eq!(order.total(), 4.0);
    }

    #[test]
    fn test_negative_price_is_rejected_without_side_effects() {
        let mut order = Order::create("alice@example.com");

        let result = order.add_item(Uuid::new_v4(), 1, -0.01);
        assert!(matches!(result, Err(OrderError::InvalidPrice(_))));

        let result = order.add_item(Uuid::new_v4(), 1, f64::NAN);
        assert!(matches!(result, Err(OrderError::InvalidPrice(_))));

        assert!(order.is_empty());
        assert_eq!(order.total(), 0.0);
    }

    #[test]
    fn test_zero_price_is_allowed() {
        let mut order = Order::create("alice@example.com");
        order.add_item(Uuid::new_v4(), 5, 0.0).unwrap();

        assert_eq!(order.items().len(), 1);
        assert_eq!(order.total(), 0.0);
    }

    #[test]
    fn test_total_matches_sum_of_lines() {
        let mut order = Order::create("carol@example.com");
        let lines = [(3, 0.1), (7, 2.25), (1, 99.99), (12, 0.05)];
        let mut expected = 0.0;
        for (quantity, price) in lines {
            order.add_item(Uuid::new_v4(), quantity, price).unwrap();
            expected += quantity as f64 * price;
        }

        let summed: f64 = order.items().iter().map(OrderItem::line_total).sum();
        assert_eq!(order.total(), expected);
        assert!((order.total() - summed).abs() < 1e-9);
    }

    #[test]
    fn test_timestamps_fit_microsecond_storage() {
        let mut order = Order::create("dave@example.com");
        order.add_item(Uuid::new_v4(), 1, 2.0).unwrap();
        order.add_item(Uuid::new_v4(), 2, 3.0).unwrap();

        assert_eq!(order.created_at().timestamp_subsec_nanos() % 1_000, 0);
        for item in order.items() {
            assert_eq!(item.created_at.timestamp_subsec_nanos() % 1_000, 0);
        }

        let restored = Order::restore(
            order.id(),
            order.user_email().to_string(),
            order.items().to_vec(),
            order.total(),
            order.created_at().trunc_subsecs(6),
        );
        assert_eq!(restored, order);
    }
}
