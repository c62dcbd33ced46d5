use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregate::Order;
use super::value_objects::OrderStatus;

/// Selection criteria for order listings. Empty filter = every order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    /// Inclusive lower bound on `created_at`
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub created_until: Option<DateTime<Utc>>,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self.created_until = Some(until);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |id| order.user_id() == id)
            && self.status.map_or(true, |status| order.status() == status)
            && self.created_from.map_or(true, |from| order.created_at() >= from)
            && self.created_until.map_or(true, |until| order.created_at() < until)
    }
}
