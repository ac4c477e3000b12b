use std::sync::Arc;

use crate::link::LinkHeaderError;
use crate::model::{
    Collection, CollectionDraft, Product, ProductDraft, ProductId, ProductUpdate, Variant,
    VariantPriceUpdate,
};

/// Errors from the write side.
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    /// The destination answered with a non-success status below 500.
    /// Drivers log these and move on to the next item.
    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Pagination(#[from] LinkHeaderError),
}

impl DestinationError {
    /// Failures scoped to a single item: the run skips the item and goes on.
    /// Everything else aborts the current phase.
    pub fn is_item_scoped(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Parse(_))
    }
}

/// One page of the destination product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Cursor for the following page, if any.
    pub next: Option<String>,
}

/// Write side of the migration: the catalog being populated.
#[async_trait::async_trait]
pub trait CatalogDestination: Send + Sync {
    /// Fetch one listing page. `cursor` is `None` for the first page and
    /// otherwise the `next` value of the previous page.
    async fn list_products(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ProductPage, DestinationError>;

    /// Create a product. `Ok(None)` means the destination accepted the
    /// write but its response body could not be read.
    async fn create_product(
        &self,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, DestinationError>;

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, DestinationError>;

    async fn update_variant(&self, update: &VariantPriceUpdate)
    -> Result<Variant, DestinationError>;

    /// Create a collection. `Ok(None)` as for `create_product`.
    async fn create_collection(
        &self,
        draft: &CollectionDraft,
    ) -> Result<Option<Collection>, DestinationError>;
}

#[async_trait::async_trait]
impl<T: CatalogDestination + ?Sized> CatalogDestination for Arc<T> {
    async fn list_products(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ProductPage, DestinationError> {
        (**self).list_products(cursor, page_size).await
    }

    async fn create_product(
        &self,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, DestinationError> {
        (**self).create_product(draft).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, DestinationError> {
        (**self).update_product(id, update).await
    }

    async fn update_variant(
        &self,
        update: &VariantPriceUpdate,
    ) -> Result<Variant, DestinationError> {
        (**self).update_variant(update).await
    }

    async fn create_collection(
        &self,
        draft: &CollectionDraft,
    ) -> Result<Option<Collection>, DestinationError> {
        (**self).create_collection(draft).await
    }
}
