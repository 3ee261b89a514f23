// ============================================================================
// Order Pipeline
// ============================================================================
//
// Order creation against a remote catalog, an atomic Postgres write, a
// best-effort `order.created` publish, and the consumer loop that reacts to
// those announcements.
//
// ============================================================================

pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod pricing;
pub mod service;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
