use std::collections::HashMap;

use crate::destination::{CatalogDestination, DestinationError};
use crate::model::ProductId;
use crate::throttle::Throttle;

/// SKU to destination product id, as seen on the destination right now.
///
/// Always rebuilt from a full listing walk; never patched incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    entries: HashMap<String, ProductId>,
}

impl IdentityMap {
    pub const DEFAULT_PAGE_SIZE: u32 = 250;

    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every page of the destination listing and record each product's
    /// primary SKU. The throttle is paused before every `next` page.
    ///
    /// Products without a SKU on their first variant are not mapped. If a SKU
    /// appears twice, the later product wins.
    pub async fn build(
        destination: &dyn CatalogDestination,
        throttle: &dyn Throttle,
        page_size: u32,
    ) -> Result<Self, DestinationError> {
        let mut map = Self::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = destination
                .list_products(cursor.as_deref(), page_size)
                .await?;
            pages += 1;

            for product in &page.products {
                match product.primary_sku() {
                    Some(sku) => map.insert(sku, product.id),
                    None => tracing::debug!(product_id = %product.id, "product has no SKU, not mapped"),
                }
            }

            match page.next {
                Some(next) => {
                    throttle.pause().await;
                    cursor = Some(next);
                }
                None => break,
            }
        }

        tracing::info!(pages, skus = map.len(), "identity map built");
        Ok(map)
    }

    pub fn insert(&mut self, sku: impl Into<String>, id: ProductId) {
        self.entries.insert(sku.into(), id);
    }

    pub fn get(&self, sku: &str) -> Option<ProductId> {
        self.entries.get(sku).copied()
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.entries.contains_key(sku)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ProductId)> for IdentityMap {
    fn from_iter<I: IntoIterator<Item = (S, ProductId)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (sku, id) in iter {
            map.insert(sku, id);
        }
        map
    }
}
