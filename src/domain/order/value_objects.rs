use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

/// A line the caller asked for. The price is resolved later from the catalog.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderLine {
    #[serde(rename = "productID")]
    pub product_id: Uuid,
    pub quantity: i32,
}

impl OrderLine {
    pub fn new(product_id: Uuid, quantity: i32) -> Self {
        Self { product_id, quantity }
    }
}
