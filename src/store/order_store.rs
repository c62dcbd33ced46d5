use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::{Order, OrderError, OrderEvent, OrderFilter};
use crate::event_sourcing::{Aggregate, EventEnvelope};

// ============================================================================
// Order Repository - persistence port
// ============================================================================
//
// Responsibilities:
// 1. Commit a new order together with its creation events, or nothing
// 2. Commit status changes under optimistic concurrency (expected version)
// 3. Serve snapshots, listings and the per-order event history
//
// The snapshot is only ever changed by applying committed events.
//
// ============================================================================

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Store a brand-new order and its creation events as one unit.
    async fn save_order_atomic(
        &self,
        order: &Order,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<Order, OrderError>;

    async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError>;

    /// Apply status-change events to the stored order if its version is still
    /// `expected_version`; otherwise fail with `Conflict`.
    async fn update_order_status(
        &self,
        order_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<Order, OrderError>;

    /// Orders matching `filter`, newest first
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError>;

    async fn load_events(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>, OrderError>;
}

struct StoredOrder {
    snapshot: Order,
    history: Vec<EventEnvelope<OrderEvent>>,
}

/// In-process store. Each write holds the map's write lock for its whole
/// check-and-commit, which serialises writers per store.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, StoredOrder>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Envelopes must continue the history exactly after `version`
fn check_sequence(
    events: &[EventEnvelope<OrderEvent>],
    order_id: Uuid,
    version: i64,
) -> Result<(), OrderError> {
    if events.is_empty() {
        return Err(OrderError::InvalidInput("cannot commit an empty event batch".to_string()));
    }

    for (envelope, expected_seq) in events.iter().zip(version + 1..) {
        if envelope.aggregate_id != order_id || envelope.sequence_number != expected_seq {
            return Err(OrderError::InvalidInput(format!(
                "event {} does not continue order {} at sequence {}",
                envelope.event_id, order_id, expected_seq
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    async fn save_order_atomic(
        &self,
        order: &Order,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<Order, OrderError> {
        let order_id = order.id();
        check_sequence(&events, order_id, 0)?;

        let mut orders = self.orders.write().await;
        if let Some(existing) = orders.get(&order_id) {
            return Err(OrderError::Conflict {
                order_id,
                expected: 0,
                actual: existing.snapshot.version(),
            });
        }

        let mut snapshot = order.clone();
        snapshot.set_version(events.len() as i64);
        orders.insert(order_id, StoredOrder {
            snapshot: snapshot.clone(),
            history: events,
        });

        tracing::info!(
            order_id = %order_id,
            user_id = %snapshot.user_id(),
            line_count = snapshot.line_items().len(),
            "Stored new order"
        );

        Ok(snapshot)
    }

    async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).map(|stored| stored.snapshot.clone()))
    }

    async fn update_order_status(
        &self,
        order_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<OrderEvent>>,
    ) -> Result<Order, OrderError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let current_version = stored.snapshot.version();
        if current_version != expected_version {
            tracing::warn!(
                order_id = %order_id,
                expected_version,
                current_version,
                "Rejected stale order update"
            );
            return Err(OrderError::Conflict {
                order_id,
                expected: expected_version,
                actual: current_version,
            });
        }
        check_sequence(&events, order_id, current_version)?;

        // Work on a copy so a bad event leaves the stored order untouched
        let mut snapshot = stored.snapshot.clone();
        for envelope in &events {
            snapshot.apply_event(&envelope.event_data)?;
        }
        snapshot.set_version(current_version + events.len() as i64);

        stored.snapshot = snapshot.clone();
        stored.history.extend(events);

        tracing::debug!(
            order_id = %order_id,
            status = %snapshot.status(),
            version = snapshot.version(),
            "Committed order update"
        );

        Ok(snapshot)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.read().await;
        let mut found: Vec<Order> = orders
            .values()
            .map(|stored| &stored.snapshot)
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();

        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
        Ok(found)
    }

    async fn load_events(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>, OrderError> {
        let orders = self.orders.read().await;
        Ok(orders
            .get(&order_id)
            .map(|stored| stored.history.clone())
            .unwrap_or_default())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
