// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (OrderLine)
// - Errors (OrderError)
// - Aggregate (Order, OrderItem)
// - Events (OrderCreatedEvent, the `order.created` wire format)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod events;

pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
pub use events::*;
