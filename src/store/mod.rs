// ============================================================================
// Order Store - persistence for order snapshots and their event history
// ============================================================================

pub mod order_store;

pub use order_store::{InMemoryOrderStore, OrderRepository};
