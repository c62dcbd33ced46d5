use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::event_sourcing::Aggregate;
use super::value_objects::{LineItem, OrderStatus};
use super::events::*;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::money;

/// Longest accepted special-instructions text, in characters
pub const MAX_SPECIAL_INSTRUCTIONS_CHARS: usize = 500;

// ============================================================================
// Order Aggregate
// ============================================================================
//
// Fields are only written by applying events. After placement the only thing
// that ever changes is `status` (and `updated_at` alongside it).
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    version: i64,

    user_id: Uuid,
    line_items: Vec<LineItem>,
    total_amount: Decimal,
    status: OrderStatus,
    special_instructions: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn special_instructions(&self) -> Option<&str> {
        self.special_instructions.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Whether the stored total still equals the sum of the line subtotals
    pub fn total_matches_lines(&self) -> bool {
        money::sum(self.line_items.iter().map(LineItem::subtotal))
            .map(|sum| sum == self.total_amount)
            .unwrap_or(false)
    }

    /// Trim instructions, drop them when blank, reject oversized text.
    pub fn normalize_instructions(raw: Option<&str>) -> Result<Option<String>, OrderError> {
        let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let chars = text.chars().count();
        if chars > MAX_SPECIAL_INSTRUCTIONS_CHARS {
            return Err(OrderError::InvalidInput(format!(
                "special instructions are {} characters, limit is {}",
                chars, MAX_SPECIAL_INSTRUCTIONS_CHARS
            )));
        }

        Ok(Some(text.to_string()))
    }

    fn advance(&self, target: OrderStatus, requested_by: Uuid) -> Result<Vec<OrderEvent>, OrderError> {
        let from = self.status;
        let rejected = OrderError::InvalidTransition { from, to: target };

        if from.is_terminal() {
            return Err(rejected);
        }
        if target == from {
            return Ok(vec![]);
        }

        // Any strictly later stage is accepted; Cancelled has no stage
        match (from.stage(), target.stage()) {
            (Some(current), Some(next)) if next > current => {
                Ok(vec![OrderEvent::StatusAdvanced(OrderStatusAdvanced {
                    from,
                    to: target,
                    advanced_by: requested_by,
                    advanced_at: Utc::now(),
                })])
            }
            _ => Err(rejected),
        }
    }

    fn cancel(&self, requested_by: Uuid) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.is_cancellable() {
            return Err(OrderError::InvalidState(self.status));
        }

        Ok(vec![OrderEvent::Cancelled(OrderCancelled {
            from: self.status,
            cancelled_by: requested_by,
            cancelled_at: Utc::now(),
        })])
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn initial_events(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let OrderCommand::PlaceOrder { order_id, user_id, line_items, special_instructions } = command
        else {
            return Err(OrderError::NotInitialized);
        };

        if line_items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if let Some(line) = line_items.iter().find(|line| line.quantity() < 1) {
            return Err(OrderError::InvalidQuantity(line.quantity()));
        }

        let special_instructions = Self::normalize_instructions(special_instructions.as_deref())?;
        let total_amount = money::sum(line_items.iter().map(LineItem::subtotal))?;

        Ok(vec![OrderEvent::Placed(OrderPlaced {
            order_id: *order_id,
            user_id: *user_id,
            line_items: line_items.clone(),
            total_amount,
            special_instructions,
            placed_at: Utc::now(),
        })])
    }

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Placed(e) => Ok(Self {
                id: e.order_id,
                version: 0,
                user_id: e.user_id,
                line_items: e.line_items.clone(),
                total_amount: e.total_amount,
                status: OrderStatus::Pending,
                special_instructions: e.special_instructions.clone(),
                created_at: e.placed_at,
                updated_at: e.placed_at,
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Placed(_) => {
                return Err(OrderError::InvalidInput(format!("order {} is already placed", self.id)));
            }
            OrderEvent::StatusAdvanced(e) => {
                self.status = e.to;
                self.updated_at = e.advanced_at;
            }
            OrderEvent::Cancelled(e) => {
                self.status = OrderStatus::Cancelled;
                self.updated_at = e.cancelled_at;
            }
        }

        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder { .. } => {
                Err(OrderError::InvalidInput(format!("order {} is already placed", self.id)))
            }
            OrderCommand::AdvanceStatus { target, requested_by } => self.advance(*target, *requested_by),
            OrderCommand::CancelOrder { requested_by } => self.cancel(*requested_by),
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
