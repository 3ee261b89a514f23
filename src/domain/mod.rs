// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Aggregates and the rules that keep them consistent. Nothing in here
// performs I/O; pricing, persistence and messaging live behind the traits
// in `pricing`, `store` and `messaging`.
//
// ============================================================================

pub mod order;
