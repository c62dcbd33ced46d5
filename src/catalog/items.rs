use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Menu entry as the ordering core sees it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub available: bool,
}

impl CatalogItem {
    pub fn new(name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            unit_price,
            available: true,
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Resolves menu items by id. `Ok(None)` means the item does not exist.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn get_item(&self, item_id: Uuid) -> anyhow::Result<Option<CatalogItem>>;
}

/// Catalog held in memory; used by the demo binary and tests.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<Uuid, CatalogItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, item: CatalogItem) -> Uuid {
        let id = item.id;
        self.items.write().await.insert(id, item);
        id
    }

    /// Returns false when the item is unknown
    pub async fn set_price(&self, item_id: Uuid, unit_price: Decimal) -> bool {
        match self.items.write().await.get_mut(&item_id) {
            Some(item) => {
                item.unit_price = unit_price;
                true
            }
            None => false,
        }
    }

    /// Returns false when the item is unknown
    pub async fn set_available(&self, item_id: Uuid, available: bool) -> bool {
        match self.items.write().await.get_mut(&item_id) {
            Some(item) => {
                item.available = available;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn get_item(&self, item_id: Uuid) -> anyhow::Result<Option<CatalogItem>> {
        Ok(self.items.read().await.get(&item_id).cloned())
    }
}
