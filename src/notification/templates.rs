use uuid::Uuid;

use crate::domain::order::{short_ref, OrderStatus};

/// Customer-facing message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    OrderConfirmed,
    OrderReady,
}

impl Template {
    /// Message to send when an order moves from `previous` to `next`, if any.
    pub fn for_transition(previous: OrderStatus, next: OrderStatus) -> Option<Self> {
        if previous == next {
            return None;
        }
        match next {
            OrderStatus::Ready => Some(Template::OrderReady),
            OrderStatus::Confirmed => Some(Template::OrderConfirmed),
            _ => None,
        }
    }

    pub fn render(&self, order_id: Uuid) -> String {
        let reference = short_ref(order_id);
        match self {
            Template::OrderReady => format!(
                "Your order #{} is ready for pickup! Please collect it from the canteen counter.",
                reference
            ),
            Template::OrderConfirmed => format!(
                "Your order #{} has been confirmed! We'll notify you when it's ready for pickup.",
                reference
            ),
        }
    }

    /// Metric/log label
    pub fn label(&self) -> &'static str {
        match self {
            Template::OrderReady => "order_ready",
            Template::OrderConfirmed => "order_confirmed",
        }
    }
}
