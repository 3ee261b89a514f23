// ============================================================================
// Application Services
// ============================================================================
//
// Orchestration over the domain and the injected capabilities.
//
// ============================================================================

mod order_service;

pub use order_service::{OrderService, OrderServiceError};
