//! In-memory collaborators for exercising the sync engine without a network.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::destination::{CatalogDestination, DestinationError, ProductPage};
use crate::model::{
    CategoryDetail, CategoryNode, CategoryProductLink, Collection, CollectionDraft, Product,
    ProductDraft, ProductId, ProductUpdate, SourceProduct, Variant, VariantId, VariantPriceUpdate,
};
use crate::source::{CatalogSource, SourceError};
use crate::throttle::Throttle;

/// Destination product whose single variant has id `id * 10`.
pub fn product(id: u64, sku: &str) -> Product {
    Product {
        id: ProductId(id),
        title: format!("Product {id}"),
        variants: vec![Variant {
            id: VariantId(id * 10),
            sku: Some(sku.to_owned()),
            price: Some("0.00".to_owned()),
        }],
    }
}

pub fn source_product(sku: &str, name: &str, price: f64) -> SourceProduct {
    SourceProduct {
        id: 0,
        sku: sku.to_owned(),
        name: name.to_owned(),
        price,
        custom_attributes: vec![],
        media_gallery_entries: vec![],
    }
}

pub fn category(id: u64, name: &str, children: Vec<CategoryNode>) -> CategoryNode {
    CategoryNode {
        id,
        name: name.to_owned(),
        children_data: children,
    }
}

pub fn category_detail(id: u64, name: &str, skus: &[&str]) -> CategoryDetail {
    CategoryDetail {
        id,
        name: name.to_owned(),
        custom_attributes: vec![],
        products: listing(skus),
    }
}

pub fn listing(skus: &[&str]) -> Vec<CategoryProductLink> {
    skus.iter()
        .enumerate()
        .map(|(i, sku)| CategoryProductLink {
            sku: (*sku).to_owned(),
            position: Some(i as i64),
        })
        .collect()
}

/// Counts pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct CountingThrottle {
    pauses: AtomicUsize,
}

impl CountingThrottle {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Throttle for CountingThrottle {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Source catalog held in memory. Anything not added reads as unavailable.
#[derive(Default)]
pub struct InMemoryCatalog {
    tree: Option<CategoryNode>,
    listings: HashMap<u64, Vec<CategoryProductLink>>,
    products: HashMap<String, SourceProduct>,
    details: HashMap<u64, CategoryDetail>,
    malformed_products: HashSet<String>,
    malformed_categories: HashSet<u64>,
    unreachable_products: HashSet<String>,
    product_requests: Mutex<Vec<String>>,
    detail_requests: Mutex<Vec<u64>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(mut self, tree: CategoryNode) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn with_listing(mut self, category_id: u64, links: Vec<CategoryProductLink>) -> Self {
        self.listings.insert(category_id, links);
        self
    }

    pub fn with_product(mut self, product: SourceProduct) -> Self {
        self.products.insert(product.sku.clone(), product);
        self
    }

    pub fn with_category(mut self, detail: CategoryDetail) -> Self {
        self.details.insert(detail.id, detail);
        self
    }

    /// Fail reads of this SKU as an undecodable record.
    pub fn with_malformed_product(mut self, sku: &str) -> Self {
        self.malformed_products.insert(sku.to_owned());
        self
    }

    /// Fail reads of this category detail as an undecodable record.
    pub fn with_malformed_category(mut self, category_id: u64) -> Self {
        self.malformed_categories.insert(category_id);
        self
    }

    /// Fail reads of this SKU with a network error.
    pub fn with_unreachable_product(mut self, sku: &str) -> Self {
        self.unreachable_products.insert(sku.to_owned());
        self
    }

    /// SKUs requested through `product`, in order.
    pub fn product_requests(&self) -> Vec<String> {
        self.product_requests.lock().unwrap().clone()
    }

    /// Category ids requested through `category_detail`, in order.
    pub fn detail_requests(&self) -> Vec<u64> {
        self.detail_requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn category_tree(&self) -> Result<Option<CategoryNode>, SourceError> {
        Ok(self.tree.clone())
    }

    async fn catalog_products(
        &self,
        category_id: u64,
    ) -> Result<Option<Vec<CategoryProductLink>>, SourceError> {
        Ok(self.listings.get(&category_id).cloned())
    }

    async fn product(&self, sku: &str) -> Result<Option<SourceProduct>, SourceError> {
        self.product_requests.lock().unwrap().push(sku.to_owned());
        if self.unreachable_products.contains(sku) {
            return Err(SourceError::Network(format!("products/{sku}: connection reset")));
        }
        if self.malformed_products.contains(sku) {
            return Err(SourceError::Parse(format!(
                "products/{sku}: invalid type: null, expected f64"
            )));
        }
        Ok(self.products.get(sku).cloned())
    }

    async fn category_detail(
        &self,
        category_id: u64,
    ) -> Result<Option<CategoryDetail>, SourceError> {
        self.detail_requests.lock().unwrap().push(category_id);
        if self.malformed_categories.contains(&category_id) {
            return Err(SourceError::Parse(format!(
                "categories/{category_id}: expected a JSON object"
            )));
        }
        Ok(self.details.get(&category_id).cloned())
    }
}

/// A write attempted against `RecordingDestination`.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    CreateProduct(ProductDraft),
    UpdateProduct(ProductId, ProductUpdate),
    UpdateVariant(VariantPriceUpdate),
    CreateCollection(CollectionDraft),
}

#[derive(Default)]
struct DestinationState {
    pages: Vec<Vec<Product>>,
    listing_requests: usize,
    writes: Vec<Write>,
    next_id: u64,
}

/// Destination that serves a fixed set of listing pages and records writes.
///
/// Created products are appended to the last page, so a later listing walk
/// sees them. Cursors are opaque `page-N` strings.
#[derive(Default)]
pub struct RecordingDestination {
    state: Mutex<DestinationState>,
    rejected_skus: HashSet<String>,
    rejected_collections: HashSet<String>,
    reject_variants: bool,
    fail_transport: bool,
    unreadable_creates: bool,
}

impl RecordingDestination {
    pub fn with_pages(pages: Vec<Vec<Product>>) -> Self {
        Self {
            state: Mutex::new(DestinationState {
                pages,
                next_id: 1000,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Reject creates and product updates for this SKU with HTTP 422.
    pub fn rejecting_sku(mut self, sku: &str) -> Self {
        self.rejected_skus.insert(sku.to_owned());
        self
    }

    /// Reject collection creates with this title with HTTP 422.
    pub fn rejecting_collection(mut self, title: &str) -> Self {
        self.rejected_collections.insert(title.to_owned());
        self
    }

    pub fn rejecting_variant_updates(mut self) -> Self {
        self.reject_variants = true;
        self
    }

    /// Fail every write with a transport error, without recording it.
    pub fn failing_transport(mut self) -> Self {
        self.fail_transport = true;
        self
    }

    /// Accept creates but answer with a body that cannot be read back.
    pub fn with_unreadable_create_responses(mut self) -> Self {
        self.unreadable_creates = true;
        self
    }

    pub fn listing_requests(&self) -> usize {
        self.state.lock().unwrap().listing_requests
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn creates(&self) -> Vec<ProductDraft> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                Write::CreateProduct(draft) => Some(draft),
                _ => None,
            })
            .collect()
    }

    pub fn product_updates(&self) -> Vec<(ProductId, ProductUpdate)> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                Write::UpdateProduct(id, update) => Some((id, update)),
                _ => None,
            })
            .collect()
    }

    pub fn variant_updates(&self) -> Vec<VariantPriceUpdate> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                Write::UpdateVariant(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn collections(&self) -> Vec<CollectionDraft> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                Write::CreateCollection(draft) => Some(draft),
                _ => None,
            })
            .collect()
    }

    fn check_transport(&self) -> Result<(), DestinationError> {
        if self.fail_transport {
            return Err(DestinationError::Transport("connection reset".into()));
        }
        Ok(())
    }

    fn rejected(detail: &str) -> DestinationError {
        DestinationError::Rejected {
            status: 422,
            body: format!(r#"{{"errors":"{detail}"}}"#),
        }
    }
}

#[async_trait::async_trait]
impl CatalogDestination for RecordingDestination {
    async fn list_products(
        &self,
        cursor: Option<&str>,
        _page_size: u32,
    ) -> Result<ProductPage, DestinationError> {
        let mut state = self.state.lock().unwrap();
        state.listing_requests += 1;

        let index = match cursor {
            None => 0,
            Some(c) => c
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| DestinationError::Parse(format!("bad cursor {c}")))?,
        };

        let products = state.pages.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < state.pages.len()).then(|| format!("page-{}", index + 1));

        Ok(ProductPage { products, next })
    }

    async fn create_product(
        &self,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, DestinationError> {
        self.check_transport()?;
        let mut state = self.state.lock().unwrap();
        state.writes.push(Write::CreateProduct(draft.clone()));

        let sku = draft.variants.first().map(|v| v.sku.clone());
        if sku.as_ref().is_some_and(|s| self.rejected_skus.contains(s)) {
            return Err(Self::rejected("sku has already been taken"));
        }

        state.next_id += 1;
        let id = state.next_id;
        let created = Product {
            id: ProductId(id),
            title: draft.title.clone(),
            variants: vec![Variant {
                id: VariantId(id * 10),
                sku,
                price: draft.variants.first().map(|v| format!("{:.2}", v.price)),
            }],
        };

        if state.pages.is_empty() {
            state.pages.push(Vec::new());
        }
        if let Some(last) = state.pages.last_mut() {
            last.push(created.clone());
        }

        Ok((!self.unreadable_creates).then_some(created))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, DestinationError> {
        self.check_transport()?;
        let mut state = self.state.lock().unwrap();
        state.writes.push(Write::UpdateProduct(id, update.clone()));

        let existing = state
            .pages
            .iter_mut()
            .flatten()
            .find(|p| p.id == id)
            .ok_or_else(|| DestinationError::Rejected {
                status: 404,
                body: r#"{"errors":"Not Found"}"#.into(),
            })?;

        if existing
            .primary_sku()
            .is_some_and(|s| self.rejected_skus.contains(s))
        {
            return Err(Self::rejected("title is invalid"));
        }

        existing.title = update.title.clone();
        Ok(existing.clone())
    }

    async fn update_variant(
        &self,
        update: &VariantPriceUpdate,
    ) -> Result<Variant, DestinationError> {
        self.check_transport()?;
        let mut state = self.state.lock().unwrap();
        state.writes.push(Write::UpdateVariant(update.clone()));

        if self.reject_variants {
            return Err(Self::rejected("price is invalid"));
        }

        Ok(Variant {
            id: update.id,
            sku: None,
            price: Some(format!("{:.2}", update.price)),
        })
    }

    async fn create_collection(
        &self,
        draft: &CollectionDraft,
    ) -> Result<Option<Collection>, DestinationError> {
        self.check_transport()?;
        let mut state = self.state.lock().unwrap();
        state.writes.push(Write::CreateCollection(draft.clone()));

        if self.rejected_collections.contains(&draft.title) {
            return Err(Self::rejected("title is invalid"));
        }

        state.next_id += 1;
        let created = Collection {
            id: state.next_id,
            title: draft.title.clone(),
        };
        Ok((!self.unreadable_creates).then_some(created))
    }
}
