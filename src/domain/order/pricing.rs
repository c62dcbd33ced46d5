use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::catalog::{CatalogItem, CatalogLookup};
use crate::event_sourcing::Aggregate;
use super::aggregate::Order;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::events::OrderEvent;
use super::value_objects::{LineItem, LineRequest};

// ============================================================================
// Pricing & Line-Item Builder
// ============================================================================
//
// Resolves requested lines against the catalog, snapshots unit prices and
// produces a complete PENDING order. Nothing is written here: the result is
// handed to storage as one unit, so a failure on any line leaves no trace.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct PricingPolicy {
    /// Upper bound on the quantity of a single line
    pub max_line_quantity: i32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self { max_line_quantity: 100 }
    }
}

/// A fully formed order plus the events that created it
#[derive(Debug, Clone)]
pub struct BuiltOrder {
    pub order: Order,
    pub events: Vec<OrderEvent>,
}

pub struct OrderBuilder {
    catalog: Arc<dyn CatalogLookup>,
    policy: PricingPolicy,
}

impl OrderBuilder {
    pub fn new(catalog: Arc<dyn CatalogLookup>, policy: PricingPolicy) -> Self {
        Self { catalog, policy }
    }

    /// Price `requested` for `user_id` and build a new PENDING order.
    pub async fn build_order(
        &self,
        user_id: Uuid,
        requested: &[LineRequest],
        special_instructions: Option<&str>,
    ) -> Result<BuiltOrder, OrderError> {
        if requested.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        // Cheap checks first so bad requests never reach the catalog
        let special_instructions = Order::normalize_instructions(special_instructions)?;
        for line in requested {
            self.check_quantity(line.quantity)?;
        }

        // One lookup per distinct item keeps repeated lines on the same price
        let mut resolved: HashMap<Uuid, CatalogItem> = HashMap::new();
        let mut line_items = Vec::with_capacity(requested.len());

        for line in requested {
            let item = match resolved.get(&line.item_id) {
                Some(item) => item.clone(),
                None => {
                    let item = self.resolve(line.item_id).await?;
                    resolved.insert(item.id, item.clone());
                    item
                }
            };

            line_items.push(LineItem::priced(item.id, item.name, line.quantity, item.unit_price)?);
        }

        let command = OrderCommand::PlaceOrder {
            order_id: Uuid::now_v7(),
            user_id,
            line_items,
            special_instructions,
        };

        let events = Order::initial_events(&command)?;
        let order = Order::apply_first_event(&events[0])?;

        tracing::debug!(
            order_id = %order.id(),
            user_id = %user_id,
            line_count = order.line_items().len(),
            total = %order.total_amount(),
            "Priced new order"
        );

        Ok(BuiltOrder { order, events })
    }

    fn check_quantity(&self, quantity: i32) -> Result<(), OrderError> {
        if quantity < 1 || quantity > self.policy.max_line_quantity {
            return Err(OrderError::InvalidQuantity(quantity));
        }
        Ok(())
    }

    async fn resolve(&self, item_id: Uuid) -> Result<CatalogItem, OrderError> {
        let item = self
            .catalog
            .get_item(item_id)
            .await?
            .ok_or(OrderError::ItemNotFound(item_id))?;

        if !item.available {
            return Err(OrderError::ItemUnavailable {
                item_id,
                name: item.name,
            });
        }

        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::domain::order::OrderStatus;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn catalog_with(items: Vec<CatalogItem>) -> (Arc<InMemoryCatalog>, Vec<Uuid>) {
        let catalog = Arc::new(InMemoryCatalog::new());
        let mut ids = Vec::new();
        for item in items {
            ids.push(catalog.upsert(item).await);
        }
        (catalog, ids)
    }

    /// Counts lookups and fails for one poisoned id
    struct CountingCatalog {
        inner: InMemoryCatalog,
        calls: AtomicUsize,
        broken: Option<Uuid>,
    }

    #[async_trait]
    impl CatalogLookup for CountingCatalog {
        async fn get_item(&self, item_id: Uuid) -> anyhow::Result<Option<CatalogItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.broken == Some(item_id) {
                anyhow::bail!("catalog backend unavailable");
            }
            self.inner.get_item(item_id).await
        }
    }

    #[tokio::test]
    async fn test_build_order_totals_lines() {
        let (catalog, ids) = catalog_with(vec![
            CatalogItem::new("Paneer Roll", dec!(5.00)),
            CatalogItem::new("Cold Coffee", dec!(3.50)),
        ])
        .await;
        let builder = OrderBuilder::new(catalog, PricingPolicy::default());
        let user_id = Uuid::new_v4();

        let built = builder
            .build_order(
                user_id,
                &[LineRequest::new(ids[0], 2), LineRequest::new(ids[1], 1)],
                Some("extra napkins"),
            )
            .await
            .unwrap();

        let order = built.order;
        assert_eq!(order.total_amount(), dec!(13.50));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.user_id(), user_id);
        assert_eq!(order.line_items()[0].subtotal(), dec!(10.00));
        assert_eq!(order.line_items()[1].item_name(), "Cold Coffee");
        assert_eq!(order.special_instructions(), Some("extra napkins"));
        assert_eq!(built.events.len(), 1);
    }

    #[tokio::test]
    async fn test_total_equals_sum_of_subtotals() {
        let prices = [dec!(0.10), dec!(0.20), dec!(19.99), dec!(7.05), dec!(0.01)];
        let (catalog, ids) = catalog_with(
            prices.iter().map(|p| CatalogItem::new("dish", *p)).collect(),
        )
        .await;
        let builder = OrderBuilder::new(catalog, PricingPolicy::default());

        for quantity in 1..=9 {
            let lines: Vec<_> = ids.iter().map(|id| LineRequest::new(*id, quantity)).collect();
            let order = builder.build_order(Uuid::new_v4(), &lines, None).await.unwrap().order;

            let expected: Decimal = prices.iter().map(|p| *p * Decimal::from(quantity)).sum();
            assert_eq!(order.total_amount(), expected);
            assert!(order.total_matches_lines());
        }
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let (catalog, _) = catalog_with(vec![]).await;
        let builder = OrderBuilder::new(catalog, PricingPolicy::default());

        let result = builder.build_order(Uuid::new_v4(), &[], None).await;
        assert!(matches!(result, Err(OrderError::EmptyOrder)));
    }

    #[tokio::test]
    async fn test_unknown_item_is_rejected() {
        let (catalog, ids) = catalog_with(vec![CatalogItem::new("Vada", dec!(1.50))]).await;
        let builder = OrderBuilder::new(catalog, PricingPolicy::default());
        let missing = Uuid::new_v4();

        let result = builder
            .build_order(
                Uuid::new_v4(),
                &[LineRequest::new(ids[0], 1), LineRequest::new(missing, 1)],
                None,
            )
            .await;
        assert!(matches!(result, Err(OrderError::ItemNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_unavailable_item_is_rejected() {
        let (catalog, ids) =
            catalog_with(vec![CatalogItem::new("Biryani", dec!(8.00)).unavailable()]).await;
        let builder = OrderBuilder::new(catalog, PricingPolicy::default());

        let result = builder
            .build_order(Uuid::new_v4(), &[LineRequest::new(ids[0], 1)], None)
            .await;
        assert!(matches!(result, Err(OrderError::ItemUnavailable { ref name, .. }) if name == "Biryani"));
    }

    #[tokio::test]
    async fn test_quantity_bounds() {
        let (catalog, ids) = catalog_with(vec![CatalogItem::new("Puri", dec!(2.00))]).await;
        let builder = OrderBuilder::new(catalog, PricingPolicy { max_line_quantity: 10 });

        for bad in [0, -3, 11] {
            let result = builder
                .build_order(Uuid::new_v4(), &[LineRequest::new(ids[0], bad)], None)
                .await;
            assert!(matches!(result, Err(OrderError::InvalidQuantity(q)) if q == bad));
        }

        let ok = builder
            .build_order(Uuid::new_v4(), &[LineRequest::new(ids[0], 10)], None)
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_instructions_are_rejected_before_lookup() {
        let catalog = Arc::new(CountingCatalog {
            inner: InMemoryCatalog::new(),
            calls: AtomicUsize::new(0),
            broken: None,
        });
        let builder = OrderBuilder::new(catalog.clone(), PricingPolicy::default());
        let text = "a".repeat(501);

        let result = builder
            .build_order(Uuid::new_v4(), &[LineRequest::new(Uuid::new_v4(), 1)], Some(&text))
            .await;
        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeated_item_is_looked_up_once() {
        let inner = InMemoryCatalog::new();
        let id = inner.upsert(CatalogItem::new("Gulab Jamun", dec!(1.25))).await;
        let catalog = Arc::new(CountingCatalog { inner, calls: AtomicUsize::new(0), broken: None });
        let builder = OrderBuilder::new(catalog.clone(), PricingPolicy::default());

        let order = builder
            .build_order(
                Uuid::new_v4(),
                &[LineRequest::new(id, 2), LineRequest::new(id, 4)],
                None,
            )
            .await
            .unwrap()
            .order;

        assert_eq!(order.line_items().len(), 2);
        assert_eq!(order.total_amount(), dec!(7.50));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_catalog_failure_surfaces_as_collaborator_error() {
        let inner = InMemoryCatalog::new();
        let broken = inner.upsert(CatalogItem::new("Uttapam", dec!(3.00))).await;
        let catalog = Arc::new(CountingCatalog { inner, calls: AtomicUsize::new(0), broken: Some(broken) });
        let builder = OrderBuilder::new(catalog, PricingPolicy::default());

        let result = builder
            .build_order(Uuid::new_v4(), &[LineRequest::new(broken, 1)], None)
            .await;
        assert!(matches!(result, Err(OrderError::Collaborator(_))));
    }
}
