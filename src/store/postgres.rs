use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::order::{Order, OrderItem};
use super::{OrderStore, StoreError};

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// Tables:
// - orders      (id, user_email, total, created_at)
// - order_items (id, order_id, position, product_id, quantity, price, created_at)
//
// `position` keeps items in the order they were appended to the aggregate.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        user_email TEXT NOT NULL,
        total DOUBLE PRECISION NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS order_items (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES orders(id),
        position INT NOT NULL,
        product_id UUID NOT NULL,
        quantity INT NOT NULL CHECK (quantity > 0),
        price DOUBLE PRECISION NOT NULL CHECK (price >= 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS orders_user_email_idx ON orders (user_email)",
    "CREATE INDEX IF NOT EXISTS order_items_order_id_idx ON order_items (order_id, position)",
];

pub struct PostgresOrderStore {
    pool: PgPool,
}

#[derive(Debug)]
struct OrderRecord {
    id: Uuid,
    user_email: String,
    total: f64,
    created_at: DateTime<Utc>,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Order schema ready");
        Ok(())
    }

    async fn load_items(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, order_id, product_id, quantity, price, created_at
             FROM order_items
             WHERE order_id = ANY($1)
             ORDER BY order_id, position ASC",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }
}

fn record_from_row(row: &PgRow) -> Result<OrderRecord, StoreError> {
    Ok(OrderRecord {
        id: row.try_get("id")?,
        user_email: row.try_get("user_email")?,
        total: row.try_get("total")?,
        created_at: row.try_get("created_at")?,
    })
}

fn item_from_row(row: &PgRow) -> Result<OrderItem, StoreError> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        product_id: row.try_get("product_id")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Attach items to their orders, keeping record order and item order.
fn assemble(records: Vec<OrderRecord>, items: Vec<OrderItem>) -> Result<Vec<Order>, StoreError> {
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    let orders: Vec<Order> = records
        .into_iter()
        .map(|record| {
            let items = by_order.remove(&record.id).unwrap_or_default();
            Order::restore(record.id, record.user_email, items, record.total, record.created_at)
        })
        .collect();

    if let Some(orphan) = by_order.keys().next() {
        return Err(StoreError::Corrupt(format!(
            "items reference unknown order {}",
            orphan
        )));
    }

    Ok(orders)
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, user_email, total, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(order.id())
        .bind(order.user_email())
        .bind(order.total())
        .bind(order.created_at())
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, position, product_id, quantity, price, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(position as i32)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        // Dropping `tx` on any error above rolls the whole order back.
        tx.commit().await?;

        tracing::debug!(
            order_id = %order.id(),
            item_count = order.items().len(),
            "Persisted order with items"
        );

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, StoreError> {
        let row = sqlx::query("SELECT id, user_email, total, created_at FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let record = record_from_row(&row)?;
        let items = self.load_items(&[record.id]).await?;

        assemble(vec![record], items)?
            .pop()
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_by_user(&self, user_email: &str) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_email, total, created_at
             FROM orders
             WHERE user_email = $1
             ORDER BY created_at DESC",
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let items = self.load_items(&ids).await?;

        assemble(records, items)
    }
}
