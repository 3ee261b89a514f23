use async_trait::async_trait;
use uuid::Uuid;

// ============================================================================
// Pricing Lookup
// ============================================================================
//
// Resolves a product to its current unit price in the catalog. The order
// service calls it once per requested line, before anything is persisted.
//
// ============================================================================

mod http_client;

pub use http_client::HttpPricingClient;

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Product not found in catalog: {0}")]
    NotFound(Uuid),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PricingLookup: Send + Sync {
    async fn get_unit_price(&self, product_id: Uuid) -> Result<f64, PricingError>;
}
