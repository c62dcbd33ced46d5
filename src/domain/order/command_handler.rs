use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use uuid::Uuid;

use crate::catalog::UserDirectory;
use crate::event_sourcing::{envelop, Aggregate, EventEnvelope};
use crate::metrics::OrderMetrics;
use crate::notification::{NotificationSink, Template};
use crate::store::OrderRepository;

use super::aggregate::Order;
use super::authorization::{self, Actor};
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::events::OrderEvent;
use super::pricing::OrderBuilder;
use super::value_objects::{LineRequest, OrderStatus};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Guard → Aggregate → Events → Repository → Notification
//
// Each command is one read plus one version-checked write. Notifications go
// out only after the write has committed, and their failures stop here.
//
// ============================================================================

/// Acknowledgment returned by a successful cancellation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CancellationAck {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub cancelled_at: DateTime<Utc>,
}

pub struct OrderCommandHandler {
    builder: OrderBuilder,
    users: Arc<dyn UserDirectory>,
    repository: Arc<dyn OrderRepository>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<OrderMetrics>,
    notify_timeout: Duration,
}

impl OrderCommandHandler {
    pub fn new(
        builder: OrderBuilder,
        users: Arc<dyn UserDirectory>,
        repository: Arc<dyn OrderRepository>,
        notifier: Arc<dyn NotificationSink>,
        metrics: Arc<OrderMetrics>,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            builder,
            users,
            repository,
            notifier,
            metrics,
            notify_timeout,
        }
    }

    /// Price and store a new order for `actor`.
    pub async fn place_order(
        &self,
        actor: &Actor,
        lines: &[LineRequest],
        special_instructions: Option<&str>,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.try_place_order(actor, lines, special_instructions).await;
        self.finish("place_order", started, result)
    }

    /// Move an order forward to `target`. Re-entering the current status
    /// returns the order unchanged.
    pub async fn transition(
        &self,
        actor: &Actor,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.try_transition(actor, order_id, target).await;
        self.finish("transition", started, result)
    }

    pub async fn cancel(&self, actor: &Actor, order_id: Uuid) -> Result<CancellationAck, OrderError> {
        let started = Instant::now();
        let result = self.try_cancel(actor, order_id).await;
        self.finish("cancel", started, result)
    }

    async fn try_place_order(
        &self,
        actor: &Actor,
        lines: &[LineRequest],
        special_instructions: Option<&str>,
    ) -> Result<Order, OrderError> {
        let built = self
            .builder
            .build_order(actor.user_id, lines, special_instructions)
            .await?;

        let order_id = built.order.id();
        let envelopes = audit_envelopes(order_id, 0, built.events, actor, "place_order");
        let stored = self.repository.save_order_atomic(&built.order, envelopes).await?;

        self.metrics.orders_placed.inc();
        tracing::info!(
            order_id = %order_id,
            user_id = %actor.user_id,
            total = %stored.total_amount(),
            "Order placed"
        );

        Ok(stored)
    }

    async fn try_transition(
        &self,
        actor: &Actor,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        authorization::ensure_can_advance(actor)?;

        let previous = order.status();
        let events = order.handle_command(&OrderCommand::AdvanceStatus {
            target,
            requested_by: actor.user_id,
        })?;

        if events.is_empty() {
            tracing::debug!(order_id = %order_id, status = %previous, "Status unchanged");
            return Ok(order);
        }

        let expected_version = order.version();
        let envelopes = audit_envelopes(order_id, expected_version, events, actor, "transition");
        let updated = self
            .repository
            .update_order_status(order_id, expected_version, envelopes)
            .await?;

        self.metrics.record_transition(updated.status().as_str());
        tracing::info!(
            order_id = %order_id,
            from = %previous,
            to = %updated.status(),
            by = %actor.user_id,
            "Order status advanced"
        );

        if let Some(template) = Template::for_transition(previous, updated.status()) {
            self.notify_customer(&updated, template).await;
        }

        Ok(updated)
    }

    async fn try_cancel(&self, actor: &Actor, order_id: Uuid) -> Result<CancellationAck, OrderError> {
        let order = self.load(order_id).await?;
        authorization::ensure_can_cancel(actor, &order)?;

        let events = order.handle_command(&OrderCommand::CancelOrder {
            requested_by: actor.user_id,
        })?;

        let expected_version = order.version();
        let envelopes = audit_envelopes(order_id, expected_version, events, actor, "cancel");
        let updated = self
            .repository
            .update_order_status(order_id, expected_version, envelopes)
            .await?;

        self.metrics.cancellations.inc();
        tracing::info!(
            order_id = %order_id,
            from = %order.status(),
            by = %actor.user_id,
            "Order cancelled"
        );

        Ok(CancellationAck {
            order_id,
            status: updated.status(),
            cancelled_at: updated.updated_at(),
        })
    }

    async fn load(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.repository
            .find_order_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Best effort: the outcome is logged and counted, never returned.
    async fn notify_customer(&self, order: &Order, template: Template) {
        let outcome = match timeout(self.notify_timeout, self.deliver(order, template)).await {
            Ok(Ok(())) => "sent",
            Ok(Err(e)) => {
                tracing::error!(
                    order_id = %order.id(),
                    template = template.label(),
                    error = %e,
                    "Customer notification failed"
                );
                "failed"
            }
            Err(_) => {
                tracing::error!(
                    order_id = %order.id(),
                    template = template.label(),
                    timeout_ms = self.notify_timeout.as_millis() as u64,
                    "Customer notification timed out"
                );
                "timed_out"
            }
        };

        self.metrics.record_notification(template.label(), outcome);
    }

    async fn deliver(&self, order: &Order, template: Template) -> anyhow::Result<()> {
        let contact = self
            .users
            .get_user(order.user_id())
            .await?
            .ok_or_else(|| anyhow::anyhow!("no contact details for user {}", order.user_id()))?;

        self.notifier
            .notify(&contact.phone, &template.render(order.id()))
            .await
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        started: Instant,
        result: Result<T, OrderError>,
    ) -> Result<T, OrderError> {
        self.metrics
            .observe_duration(operation, started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            self.metrics.record_rejection(operation, e.kind());
            tracing::warn!(operation, kind = e.kind(), error = %e, "Order command rejected");
        }

        result
    }
}

/// Envelopes for one command, sharing a correlation id and tagged with the
/// operation and role that produced them.
fn audit_envelopes(
    order_id: Uuid,
    expected_version: i64,
    events: Vec<OrderEvent>,
    actor: &Actor,
    operation: &'static str,
) -> Vec<EventEnvelope<OrderEvent>> {
    envelop(order_id, expected_version, events, Uuid::new_v4(), actor.user_id)
        .into_iter()
        .map(|envelope| {
            envelope
                .with_metadata("operation", operation)
                .with_metadata("actor_role", actor.role.as_str())
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogItem, InMemoryCatalog, InMemoryUserDirectory};
    use crate::domain::order::{OrderFilter, OrderQueryService, PricingPolicy, Role};
    use crate::store::InMemoryOrderStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use tokio::sync::{Barrier, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, phone: &str, message: &str) -> anyhow::Result<()> {
            self.sent.lock().await.push((phone.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn notify(&self, _phone: &str, _message: &str) -> anyhow::Result<()> {
            anyhow::bail!("gateway rejected message")
        }
    }

    struct StalledSink;

    #[async_trait]
    impl NotificationSink for StalledSink {
        async fn notify(&self, _phone: &str, _message: &str) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    /// Holds every reader until two have read, so both see the same version.
    struct LockstepRepository {
        inner: Arc<InMemoryOrderStore>,
        barrier: Barrier,
    }

    #[async_trait]
    impl OrderRepository for LockstepRepository {
        async fn save_order_atomic(
            &self,
            order: &Order,
            events: Vec<EventEnvelope<OrderEvent>>,
        ) -> Result<Order, OrderError> {
            self.inner.save_order_atomic(order, events).await
        }

        async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
            let found = self.inner.find_order_by_id(order_id).await?;
            self.barrier.wait().await;
            Ok(found)
        }

        async fn update_order_status(
            &self,
            order_id: Uuid,
            expected_version: i64,
            events: Vec<EventEnvelope<OrderEvent>>,
        ) -> Result<Order, OrderError> {
            self.inner.update_order_status(order_id, expected_version, events).await
        }

        async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError> {
            self.inner.list_orders(filter).await
        }

        async fn load_events(&self, order_id: Uuid) -> Result<Vec<EventEnvelope<OrderEvent>>, OrderError> {
            self.inner.load_events(order_id).await
        }
    }

    struct Canteen {
        handler: OrderCommandHandler,
        store: Arc<InMemoryOrderStore>,
        catalog: Arc<InMemoryCatalog>,
        metrics: Arc<OrderMetrics>,
        customer: Actor,
        admin: Actor,
        thali: Uuid,
        lassi: Uuid,
    }

    async fn canteen_with(
        sink: Arc<dyn NotificationSink>,
        wrap: impl FnOnce(Arc<InMemoryOrderStore>) -> Arc<dyn OrderRepository>,
    ) -> Canteen {
        let catalog = Arc::new(InMemoryCatalog::new());
        let thali = catalog.upsert(CatalogItem::new("Veg Thali", dec!(5.00))).await;
        let lassi = catalog.upsert(CatalogItem::new("Lassi", dec!(3.50))).await;

        let users = Arc::new(InMemoryUserDirectory::new());
        let customer = users.register("98765 43210", Role::User).await;
        let admin = users.register("9000000000", Role::Admin).await;

        let store = Arc::new(InMemoryOrderStore::new());
        let metrics = Arc::new(OrderMetrics::new().unwrap());
        let handler = OrderCommandHandler::new(
            OrderBuilder::new(catalog.clone(), PricingPolicy::default()),
            users,
            wrap(store.clone()),
            sink,
            metrics.clone(),
            Duration::from_millis(50),
        );

        Canteen {
            handler,
            store,
            catalog,
            metrics,
            customer: Actor::user(customer.id),
            admin: Actor::admin(admin.id),
            thali,
            lassi,
        }
    }

    async fn canteen(sink: Arc<dyn NotificationSink>) -> Canteen {
        canteen_with(sink, |store| store as Arc<dyn OrderRepository>).await
    }

    impl Canteen {
        async fn lunch(&self) -> Order {
            self.handler
                .place_order(
                    &self.customer,
                    &[LineRequest::new(self.thali, 2), LineRequest::new(self.lassi, 1)],
                    Some("  no onions  "),
                )
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_place_order_stores_priced_order() {
        let c = canteen(Arc::new(RecordingSink::default())).await;
        let order = c.lunch().await;

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount(), dec!(13.50));
        assert_eq!(order.special_instructions(), Some("no onions"));
        assert_eq!(order.version(), 1);

        let stored = c.store.find_order_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored, order);

        let history = c.store.load_events(order.id()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_type, "OrderPlaced");
        assert_eq!(history[0].user_id, Some(c.customer.user_id));
        assert_eq!(history[0].metadata.get("operation").map(String::as_str), Some("place_order"));
        assert_eq!(history[0].metadata.get("actor_role").map(String::as_str), Some("USER"));
        assert_eq!(c.metrics.orders_placed.get(), 1);
    }

    #[tokio::test]
    async fn test_failed_placement_leaves_nothing_behind() {
        let c = canteen(Arc::new(RecordingSink::default())).await;
        c.catalog.set_available(c.lassi, false).await;

        let err = c
            .handler
            .place_order(
                &c.customer,
                &[LineRequest::new(c.thali, 1), LineRequest::new(c.lassi, 1)],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ItemUnavailable { .. }));
        assert!(c.store.list_orders(&OrderFilter::all()).await.unwrap().is_empty());
        assert_eq!(
            c.metrics
                .commands_rejected
                .with_label_values(&["place_order", "item_unavailable"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_price_change_does_not_touch_placed_order() {
        let c = canteen(Arc::new(RecordingSink::default())).await;
        let order = c.lunch().await;

        c.catalog.set_price(c.thali, dec!(9.99)).await;

        let stored = c.store.find_order_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.total_amount(), dec!(13.50));
        assert_eq!(stored.line_items()[0].unit_price(), dec!(5.00));
    }

    #[tokio::test]
    async fn test_ready_notifies_exactly_once() {
        let sink = Arc::new(RecordingSink::default());
        let c = canteen(sink.clone()).await;
        let order = c.lunch().await;

        c.handler.transition(&c.admin, order.id(), OrderStatus::Preparing).await.unwrap();
        let ready = c.handler.transition(&c.admin, order.id(), OrderStatus::Ready).await.unwrap();
        let again = c.handler.transition(&c.admin, order.id(), OrderStatus::Ready).await.unwrap();

        assert_eq!(ready.status(), OrderStatus::Ready);
        assert_eq!(again.version(), ready.version());

        let sent = sink.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "98765 43210");
        assert!(sent[0].1.contains("is ready for pickup"));
        assert!(sent[0].1.contains(&crate::domain::order::short_ref(order.id())));
    }

    #[tokio::test]
    async fn test_confirmation_is_notified() {
        let sink = Arc::new(RecordingSink::default());
        let c = canteen(sink.clone()).await;
        let order = c.lunch().await;

        c.handler.transition(&c.admin, order.id(), OrderStatus::Confirmed).await.unwrap();

        let sent = sink.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("has been confirmed"));
        assert_eq!(
            c.metrics.notifications.with_label_values(&["order_confirmed", "sent"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_fail_transition() {
        let c = canteen(Arc::new(FailingSink)).await;
        let order = c.lunch().await;

        let ready = c.handler.transition(&c.admin, order.id(), OrderStatus::Ready).await.unwrap();
        assert_eq!(ready.status(), OrderStatus::Ready);

        let stored = c.store.find_order_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Ready);
        assert_eq!(c.metrics.notifications.with_label_values(&["order_ready", "failed"]).get(), 1);
    }

    #[tokio::test]
    async fn test_stalled_sink_is_cut_off() {
        let c = canteen(Arc::new(StalledSink)).await;
        let order = c.lunch().await;

        let ready = c.handler.transition(&c.admin, order.id(), OrderStatus::Ready).await.unwrap();
        assert_eq!(ready.status(), OrderStatus::Ready);
        assert_eq!(
            c.metrics.notifications.with_label_values(&["order_ready", "timed_out"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_transition_rules() {
        let sink = Arc::new(RecordingSink::default());
        let c = canteen(sink.clone()).await;
        let order = c.lunch().await;

        let err = c.handler.transition(&c.customer, order.id(), OrderStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));

        let err = c.handler.transition(&c.admin, Uuid::new_v4(), OrderStatus::Ready).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));

        let err = c.handler.transition(&c.admin, order.id(), OrderStatus::Cancelled).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        c.handler.transition(&c.admin, order.id(), OrderStatus::Completed).await.unwrap();
        let err = c.handler.transition(&c.admin, order.id(), OrderStatus::Ready).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition { from: OrderStatus::Completed, to: OrderStatus::Ready }
        ));

        // Skipping straight to COMPLETED passes READY without a message
        assert!(sink.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_rules() {
        let c = canteen(Arc::new(RecordingSink::default())).await;
        let stranger = Actor::user(Uuid::new_v4());

        let first = c.lunch().await;
        let err = c.handler.cancel(&stranger, first.id()).await.unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));

        let ack = c.handler.cancel(&c.customer, first.id()).await.unwrap();
        assert_eq!(ack.order_id, first.id());
        assert_eq!(ack.status, OrderStatus::Cancelled);

        let err = c.handler.cancel(&c.customer, first.id()).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(OrderStatus::Cancelled)));

        let second = c.lunch().await;
        c.handler.transition(&c.admin, second.id(), OrderStatus::Preparing).await.unwrap();
        let err = c.handler.cancel(&c.customer, second.id()).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(OrderStatus::Preparing)));
        let err = c.handler.cancel(&c.admin, second.id()).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(OrderStatus::Preparing)));

        let third = c.lunch().await;
        c.handler.transition(&c.admin, third.id(), OrderStatus::Confirmed).await.unwrap();
        let ack = c.handler.cancel(&c.admin, third.id()).await.unwrap();
        assert_eq!(ack.status, OrderStatus::Cancelled);

        let err = c.handler.cancel(&c.admin, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
        assert_eq!(c.metrics.cancellations.get(), 2);
    }

    #[tokio::test]
    async fn test_history_records_operation_and_role() {
        let c = canteen(Arc::new(RecordingSink::default())).await;
        let order = c.lunch().await;

        c.handler.transition(&c.admin, order.id(), OrderStatus::Confirmed).await.unwrap();
        c.handler.cancel(&c.customer, order.id()).await.unwrap();

        let queries = OrderQueryService::new(c.store.clone());
        let history = queries.order_history(&c.customer, order.id()).await.unwrap();
        let tags: Vec<_> = history
            .iter()
            .map(|entry| {
                (
                    entry.metadata.get("operation").map(String::as_str),
                    entry.metadata.get("actor_role").map(String::as_str),
                )
            })
            .collect();

        assert_eq!(
            tags,
            vec![
                (Some("place_order"), Some("USER")),
                (Some("transition"), Some("ADMIN")),
                (Some("cancel"), Some("USER")),
            ]
        );
        assert_eq!(history[1].user_id, Some(c.admin.user_id));
        assert_ne!(history[1].correlation_id, history[2].correlation_id);
    }

    #[tokio::test]
    async fn test_contended_transition_has_one_winner() {
        let c = canteen_with(Arc::new(RecordingSink::default()), |store| {
            Arc::new(LockstepRepository { inner: store, barrier: Barrier::new(2) })
                as Arc<dyn OrderRepository>
        })
        .await;
        let order = c.lunch().await;

        let (confirm, prepare) = tokio::join!(
            c.handler.transition(&c.admin, order.id(), OrderStatus::Confirmed),
            c.handler.transition(&c.admin, order.id(), OrderStatus::Preparing),
        );

        let (winner, loser) = match (confirm, prepare) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            other => panic!("expected exactly one winner, got {:?}", other),
        };
        assert!(matches!(loser, OrderError::Conflict { expected: 1, actual: 2, .. }));

        let stored = c.store.find_order_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), winner.status());
        assert_eq!(stored.version(), 2);
        assert_eq!(c.store.load_events(order.id()).await.unwrap().len(), 2);
    }
}
