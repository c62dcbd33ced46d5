use uuid::Uuid;

use super::value_objects::{LineItem, OrderStatus};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    /// Lines arrive already priced by the line-item builder
    PlaceOrder {
        order_id: Uuid,
        user_id: Uuid,
        line_items: Vec<LineItem>,
        special_instructions: Option<String>,
    },
    AdvanceStatus {
        target: OrderStatus,
        requested_by: Uuid,
    },
    CancelOrder {
        requested_by: Uuid,
    },
}
