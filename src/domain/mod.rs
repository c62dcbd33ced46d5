// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Aggregates live in their own subdirectory, separate from the event sourcing
// infrastructure they build on.
//
// ============================================================================

pub mod order;
