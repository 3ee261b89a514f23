// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid item quantity: {0} (must be positive)")]
    InvalidQuantity(i32),

    #[error("Invalid unit price: {0} (must be non-negative)")]
    InvalidPrice(f64),
}
