use uuid::Uuid;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Errors
// ============================================================================

/// Every failure an order operation reports to its caller.
///
/// Notification failures never appear here; they are logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Item is not available: {name} ({item_id})")]
    ItemUnavailable { item_id: Uuid, name: String },

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order cannot be cancelled while {0}")]
    InvalidState(OrderStatus),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Concurrent update on order {order_id}: expected version {expected}, found {actual}")]
    Conflict { order_id: Uuid, expected: i64, actual: i64 },

    #[error("Aggregate not initialized")]
    NotInitialized,

    /// Catalog, directory or storage failure
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] anyhow::Error),
}

impl OrderError {
    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::ItemNotFound(_) => "item_not_found",
            OrderError::ItemUnavailable { .. } => "item_unavailable",
            OrderError::InvalidQuantity(_) => "invalid_quantity",
            OrderError::EmptyOrder => "empty_order",
            OrderError::InvalidInput(_) => "invalid_input",
            OrderError::OrderNotFound(_) => "order_not_found",
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::InvalidState(_) => "invalid_state",
            OrderError::Forbidden(_) => "forbidden",
            OrderError::Conflict { .. } => "conflict",
            OrderError::NotInitialized => "not_initialized",
            OrderError::Collaborator(_) => "collaborator",
        }
    }
}
