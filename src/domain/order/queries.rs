use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_sourcing::EventEnvelope;
use crate::store::OrderRepository;

use super::aggregate::Order;
use super::authorization::{self, Actor};
use super::errors::OrderError;
use super::events::OrderEvent;
use super::filter::OrderFilter;
use super::money;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Queries - read side, behind the same guard as the commands
// ============================================================================

/// Totals for one UTC day
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Orders created that day, whatever their status
    pub order_count: usize,
    /// Sum of totals of the day's COMPLETED orders
    pub revenue: Decimal,
}

pub struct OrderQueryService {
    repository: Arc<dyn OrderRepository>,
}

impl OrderQueryService {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order, OrderError> {
        let order = self
            .repository
            .find_order_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        authorization::ensure_can_view(actor, &order)?;
        Ok(order)
    }

    /// Orders visible to `actor` that match `filter`, newest first.
    pub async fn list_orders(&self, actor: &Actor, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
        let filter = authorization::scope_filter(actor, filter)?;
        self.repository.list_orders(&filter).await
    }

    /// Committed events of one order, oldest first
    pub async fn order_history(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<Vec<EventEnvelope<OrderEvent>>, OrderError> {
        self.get_order(actor, order_id).await?;
        self.repository.load_events(order_id).await
    }

    pub async fn daily_summary(&self, actor: &Actor, date: NaiveDate) -> Result<DailySummary, OrderError> {
        authorization::ensure_can_view_reports(actor)?;

        let start = DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(chrono::NaiveTime::MIN), Utc);
        let filter = OrderFilter::all().created_between(start, start + Duration::days(1));
        let orders = self.repository.list_orders(&filter).await?;

        let revenue = money::sum(
            orders
                .iter()
                .filter(|order| order.status() == OrderStatus::Completed)
                .map(Order::total_amount),
        )?;

        tracing::debug!(%date, order_count = orders.len(), revenue = %revenue, "Built daily summary");

        Ok(DailySummary {
            date,
            order_count: orders.len(),
            revenue,
        })
    }
}
