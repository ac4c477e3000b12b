use std::sync::Arc;

use crate::model::{CategoryDetail, CategoryNode, CategoryProductLink, SourceProduct};

/// Errors from the read side.
///
/// Non-success statuses below 500 are not errors: implementations log them
/// and return `Ok(None)` so the caller can skip the item.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl SourceError {
    /// A record that could not be decoded only affects that record. Network
    /// and snapshot failures abort the current phase.
    pub fn is_item_scoped(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

/// Read side of the migration: the catalog being copied.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// The full category tree, rooted at the catalog's top category.
    async fn category_tree(&self) -> Result<Option<CategoryNode>, SourceError>;

    /// Every product assigned to the given category, in listing order.
    /// Used with the root category to enumerate the whole catalog.
    async fn catalog_products(
        &self,
        category_id: u64,
    ) -> Result<Option<Vec<CategoryProductLink>>, SourceError>;

    /// Full product detail by SKU.
    async fn product(&self, sku: &str) -> Result<Option<SourceProduct>, SourceError>;

    /// Category detail joined with that category's own membership list.
    async fn category_detail(&self, category_id: u64)
    -> Result<Option<CategoryDetail>, SourceError>;
}

#[async_trait::async_trait]
impl<T: CatalogSource + ?Sized> CatalogSource for Arc<T> {
    async fn category_tree(&self) -> Result<Option<CategoryNode>, SourceError> {
        (**self).category_tree().await
    }

    async fn catalog_products(
        &self,
        category_id: u64,
    ) -> Result<Option<Vec<CategoryProductLink>>, SourceError> {
        (**self).catalog_products(category_id).await
    }

    async fn product(&self, sku: &str) -> Result<Option<SourceProduct>, SourceError> {
        (**self).product(sku).await
    }

    async fn category_detail(
        &self,
        category_id: u64,
    ) -> Result<Option<CategoryDetail>, SourceError> {
        (**self).category_detail(category_id).await
    }
}
