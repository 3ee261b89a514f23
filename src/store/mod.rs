use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::Order;

// ============================================================================
// Order Store
// ============================================================================
//
// Persistence contract for orders. `create` writes the order row and all of
// its item rows as one unit; there are no update or delete operations.
//
// ============================================================================

mod postgres;

pub use postgres::PostgresOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt order data: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the order together with its items, atomically.
    async fn create(&self, order: &Order) -> Result<(), StoreError>;

    /// Load one order with its items.
    async fn find_by_id(&self, id: Uuid) -> Result<Order, StoreError>;

    /// Load every order placed by `user_email`, newest first.
    async fn find_by_user(&self, user_email: &str) -> Result<Vec<Order>, StoreError>;
}
