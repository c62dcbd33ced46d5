use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use canteen_orders::catalog::{CatalogItem, InMemoryCatalog, InMemoryUserDirectory};
use canteen_orders::config::AppConfig;
use canteen_orders::domain::order::{
    money, short_ref, Actor, LineRequest, OrderBuilder, OrderCommandHandler, OrderFilter,
    OrderQueryService, OrderStatus, Role,
};
use canteen_orders::event_sourcing::serialize_event;
use canteen_orders::metrics::OrderMetrics;
use canteen_orders::notification::{SmsGateway, SmsNotifier};
use canteen_orders::store::InMemoryOrderStore;
use canteen_orders::utils::retry_on_transient;

/// Stand-in provider used when no real SMS transport is linked in
struct ConsoleGateway;

#[async_trait]
impl SmsGateway for ConsoleGateway {
    async fn send(&self, to: &str, from: &str, body: &str) -> anyhow::Result<String> {
        tracing::info!(to, from, body, "SMS gateway send");
        Ok(format!("console-{}", uuid::Uuid::new_v4().simple()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Default to INFO, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,canteen_orders=debug")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        sms_configured = config.sms.is_configured(),
        notify_timeout_ms = config.notify_timeout.as_millis() as u64,
        max_line_quantity = config.max_line_quantity,
        "Starting canteen order lifecycle demo"
    );

    // === 1. Collaborators ===
    let catalog = Arc::new(InMemoryCatalog::new());
    let thali = catalog
        .upsert(CatalogItem::new("Veg Thali", Decimal::new(500, 2)))
        .await;
    let lassi = catalog
        .upsert(CatalogItem::new("Sweet Lassi", Decimal::new(350, 2)))
        .await;

    let users = Arc::new(InMemoryUserDirectory::new());
    let customer = users.register("98765 43210", Role::User).await;
    let staff = users.register("91234 56789", Role::Admin).await;
    let customer = Actor::user(customer.id);
    let staff = Actor::admin(staff.id);

    let store = Arc::new(InMemoryOrderStore::new());
    let metrics = Arc::new(OrderMetrics::new()?);
    let notifier = Arc::new(SmsNotifier::new(config.sms.clone(), Arc::new(ConsoleGateway)));
    tracing::info!(live = notifier.is_live(), "SMS notifier ready");

    let handler = OrderCommandHandler::new(
        OrderBuilder::new(catalog.clone(), config.pricing_policy()),
        users,
        store.clone(),
        notifier,
        metrics.clone(),
        config.notify_timeout,
    );
    let queries = OrderQueryService::new(store);
    let retry = config.retry_config();

    // === 2. Full lifecycle ===
    let order = handler
        .place_order(
            &customer,
            &[LineRequest::new(thali, 2), LineRequest::new(lassi, 1)],
            Some("Less spicy please"),
        )
        .await?;
    tracing::info!(
        order_ref = %short_ref(order.id()),
        total = %money::format_amount(order.total_amount()),
        "Order placed"
    );

    for target in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
    ] {
        let updated = retry_on_transient(&retry, |_| handler.transition(&staff, order.id(), target))
            .await
            .with_context(|| format!("moving order {} to {}", order.id(), target))?;
        tracing::info!(order_ref = %short_ref(updated.id()), status = %updated.status(), "Order advanced");
    }

    // === 3. Cancellation ===
    let second = handler
        .place_order(&customer, &[LineRequest::new(lassi, 3)], None)
        .await?;
    let ack = handler.cancel(&customer, second.id()).await?;
    tracing::info!(order_ref = %short_ref(ack.order_id), status = %ack.status, "Order cancelled");

    // === 4. Read side ===
    let mine = queries.list_orders(&customer, OrderFilter::all()).await?;
    let history = queries.order_history(&customer, order.id()).await?;
    let summary = queries
        .daily_summary(&staff, order.created_at().date_naive())
        .await?;

    if let Some(latest) = history.last() {
        let entry = serialize_event(latest)?;
        tracing::debug!(%entry, "Latest audit entry");
    }

    tracing::info!(
        visible_orders = mine.len(),
        history_events = history.len(),
        orders_today = summary.order_count,
        revenue = %money::format_amount(summary.revenue),
        "Daily summary"
    );
    tracing::info!(
        placed = metrics.orders_placed.get(),
        cancelled = metrics.cancellations.get(),
        "Demo complete"
    );

    Ok(())
}
