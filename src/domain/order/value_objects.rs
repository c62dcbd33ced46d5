use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::money;

// ============================================================================
// Order Value Objects
// ============================================================================

/// One requested line of a new order, as submitted by the customer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRequest {
    pub item_id: Uuid,
    pub quantity: i32,
}

impl LineRequest {
    pub fn new(item_id: Uuid, quantity: i32) -> Self {
        Self { item_id, quantity }
    }
}

/// A priced order line.
///
/// The unit price is captured when the order is placed and never re-read from
/// the catalog, so later menu price changes leave historical orders untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LineItem {
    item_id: Uuid,
    item_name: String,
    quantity: i32,
    unit_price: Decimal,
    subtotal: Decimal,
}

impl LineItem {
    /// Price `quantity` units at `unit_price`. Fails on a non-positive
    /// quantity, a negative price or an amount that does not fit a decimal.
    pub fn priced(
        item_id: Uuid,
        item_name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<Self, OrderError> {
        if quantity < 1 {
            return Err(OrderError::InvalidQuantity(quantity));
        }
        if unit_price < Decimal::ZERO {
            return Err(OrderError::InvalidInput(format!(
                "unit price of item {} is negative: {}",
                item_id, unit_price
            )));
        }

        let subtotal = money::line_subtotal(unit_price, quantity)?;

        Ok(Self {
            item_id,
            item_name: item_name.into(),
            quantity,
            unit_price,
            subtotal,
        })
    }

    pub fn item_id(&self) -> Uuid {
        self.item_id
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }
}

/// Order lifecycle.
///
/// `Pending -> Confirmed -> Preparing -> Ready -> Completed`, with `Cancelled`
/// reachable only through the cancellation path. `Completed` and `Cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Position along the forward sequence; `None` for `Cancelled`, which
    /// sits outside it.
    pub fn stage(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::Ready => Some(3),
            OrderStatus::Completed => Some(4),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Cancellation window closes once kitchen work has started.
    pub fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OrderError::InvalidInput(format!("unknown order status: {s}")))
    }
}

/// Short human-facing order reference used in customer messages.
pub fn short_ref(order_id: Uuid) -> String {
    order_id.simple().to_string()[..8].to_ascii_uppercase()
}
