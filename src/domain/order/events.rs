use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::event_sourcing::DomainEvent;
use super::value_objects::{LineItem, OrderStatus};

// ============================================================================
// Order Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Placed(OrderPlaced),
    StatusAdvanced(OrderStatusAdvanced),
    Cancelled(OrderCancelled),
}

impl DomainEvent for OrderEvent {
    fn type_name(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "OrderPlaced",
            OrderEvent::StatusAdvanced(_) => "OrderStatusAdvanced",
            OrderEvent::Cancelled(_) => "OrderCancelled",
        }
    }
}

/// Order Placed - initial event, carries the priced lines
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderPlaced {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub line_items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub special_instructions: Option<String>,
    pub placed_at: DateTime<Utc>,
}

/// Order Status Advanced - staff moved the order forward
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderStatusAdvanced {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub advanced_by: Uuid,
    pub advanced_at: DateTime<Utc>,
}

/// Order Cancelled - lifecycle ended before preparation
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCancelled {
    pub from: OrderStatus,
    pub cancelled_by: Uuid,
    pub cancelled_at: DateTime<Utc>,
}
