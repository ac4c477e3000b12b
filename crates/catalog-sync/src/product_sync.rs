use crate::destination::{CatalogDestination, DestinationError};
use crate::identity::IdentityMap;
use crate::model::{
    CategoryProductLink, ProductDraft, ProductId, ProductUpdate, SourceProduct, VariantDraft,
    VariantPriceUpdate,
};
use crate::normalize::{self, Normalizer};
use crate::source::CatalogSource;
use crate::sync::{ItemFailure, SyncError};
use crate::throttle::Throttle;

/// What to do with one source product.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductAction {
    /// SKU unknown to the destination: one create carrying everything.
    Create(ProductDraft),
    /// SKU already mapped: title/body write, then a price write on the
    /// product's primary variant.
    Update {
        id: ProductId,
        update: ProductUpdate,
        price: f64,
    },
}

/// Decide between create and update. Pure; performs no I/O.
pub fn plan_product(
    product: &SourceProduct,
    identity: &IdentityMap,
    normalizer: &Normalizer,
) -> ProductAction {
    let body_html = normalize::description(product);

    match identity.get(&product.sku) {
        Some(id) => ProductAction::Update {
            id,
            update: ProductUpdate {
                title: product.name.clone(),
                body_html,
            },
            price: product.price,
        },
        None => ProductAction::Create(ProductDraft {
            title: product.name.clone(),
            body_html,
            images: normalizer.images(product),
            variants: vec![VariantDraft {
                sku: product.sku.clone(),
                price: product.price,
            }],
        }),
    }
}

/// Outcome counts for a product sync pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSyncReport {
    pub created: u64,
    pub updated: u64,
    pub failed: u64,
    /// Leading listing entries passed over because of `start_at`.
    pub skipped: u64,
    pub failures: Vec<ItemFailure>,
}

impl ProductSyncReport {
    fn record_failure(&mut self, key: &str, reason: impl Into<String>) {
        self.failed += 1;
        self.failures.push(ItemFailure::new(key, reason));
    }
}

/// Copies source products to the destination one at a time, in listing order.
pub struct ProductSync<'a> {
    source: &'a dyn CatalogSource,
    destination: &'a dyn CatalogDestination,
    throttle: &'a dyn Throttle,
    normalizer: &'a Normalizer,
    start_at: usize,
}

impl<'a> ProductSync<'a> {
    pub fn new(
        source: &'a dyn CatalogSource,
        destination: &'a dyn CatalogDestination,
        throttle: &'a dyn Throttle,
        normalizer: &'a Normalizer,
    ) -> Self {
        Self {
            source,
            destination,
            throttle,
            normalizer,
            start_at: 0,
        }
    }

    /// Skip this many leading listing entries, to resume a partial run.
    pub fn start_at(mut self, start_at: usize) -> Self {
        self.start_at = start_at;
        self
    }

    /// Sync every listed product against `identity`.
    ///
    /// Rejected writes and products the source cannot return or decode are
    /// recorded in the report and skipped. Transport faults abort the pass.
    pub async fn run(
        &self,
        listing: &[CategoryProductLink],
        identity: &IdentityMap,
    ) -> Result<ProductSyncReport, SyncError> {
        let mut report = ProductSyncReport {
            skipped: listing.len().min(self.start_at) as u64,
            ..Default::default()
        };

        for (index, entry) in listing.iter().enumerate().skip(self.start_at) {
            let sku = entry.sku.as_str();

            let fetched = match self.source.product(sku).await {
                Ok(fetched) => fetched,
                Err(e) if e.is_item_scoped() => {
                    tracing::error!(sku, index, error = %e, "product detail unreadable, skipping");
                    report.record_failure(sku, e.to_string());
                    self.throttle.pause().await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match fetched {
                Some(product) => {
                    let action = plan_product(&product, identity, self.normalizer);
                    let is_update = matches!(action, ProductAction::Update { .. });

                    match self.apply(sku, index, action).await {
                        Ok(()) if is_update => report.updated += 1,
                        Ok(()) => report.created += 1,
                        Err(e) if e.is_item_scoped() => {
                            tracing::error!(sku, index, error = %e, "product write failed");
                            report.record_failure(sku, e.to_string());
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None => {
                    tracing::warn!(sku, index, "product detail unavailable, skipping");
                    report.record_failure(sku, "product detail unavailable");
                }
            }

            self.throttle.pause().await;
        }

        tracing::info!(
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            skipped = report.skipped,
            "product sync complete"
        );

        Ok(report)
    }

    async fn apply(
        &self,
        sku: &str,
        index: usize,
        action: ProductAction,
    ) -> Result<(), DestinationError> {
        match action {
            ProductAction::Update { id, update, price } => {
                tracing::info!(sku, product_id = %id, index, "updating product");
                let updated = self.destination.update_product(id, &update).await?;

                // The price lives on the variant, which only the write
                // response tells us about. The title/body write stands even
                // if this one fails.
                let variant = updated.variants.first().ok_or_else(|| {
                    DestinationError::Parse(format!("product {id} returned no variants"))
                })?;

                self.destination
                    .update_variant(&VariantPriceUpdate {
                        id: variant.id,
                        price,
                    })
                    .await?;
                Ok(())
            }
            ProductAction::Create(draft) => {
                tracing::info!(sku, index, "creating product");
                match self.destination.create_product(&draft).await? {
                    Some(created) => {
                        tracing::debug!(sku, product_id = %created.id, "product created")
                    }
                    None => tracing::warn!(sku, "product created but response unreadable"),
                }
                Ok(())
            }
        }
    }
}
