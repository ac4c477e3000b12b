//! Full-catalog migration: the fixed phase sequence tying the drivers together.

use crate::category_sync::{CategorySync, CategorySyncReport};
use crate::destination::CatalogDestination;
use crate::identity::IdentityMap;
use crate::normalize::Normalizer;
use crate::product_sync::{ProductSync, ProductSyncReport};
use crate::source::CatalogSource;
use crate::sync::SyncError;
use crate::throttle::Throttle;

/// Knobs for a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    /// Leading products to skip when resuming a partial run.
    pub start_at: usize,
    /// Page size for destination listing walks.
    pub page_size: u32,
    /// Category left out of the tree sync, along with its subtree.
    pub excluded_category: Option<u64>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            start_at: 0,
            page_size: IdentityMap::DEFAULT_PAGE_SIZE,
            excluded_category: None,
        }
    }
}

/// Results of every phase of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Identity map size before product sync.
    pub mapped_before: usize,
    /// Identity map size after the rebuild that precedes category sync.
    pub mapped_after: usize,
    pub products: ProductSyncReport,
    pub categories: CategorySyncReport,
}

/// Sequences a full migration. Strictly serial; one run per call.
pub struct Migration<'a> {
    source: &'a dyn CatalogSource,
    destination: &'a dyn CatalogDestination,
    throttle: &'a dyn Throttle,
    normalizer: Normalizer,
    settings: MigrationSettings,
}

impl<'a> Migration<'a> {
    pub fn new(
        source: &'a dyn CatalogSource,
        destination: &'a dyn CatalogDestination,
        throttle: &'a dyn Throttle,
        normalizer: Normalizer,
        settings: MigrationSettings,
    ) -> Self {
        Self {
            source,
            destination,
            throttle,
            normalizer,
            settings,
        }
    }

    /// Run all phases:
    ///
    /// 1. map the destination (`IdentityMap::build`)
    /// 2. read the source category tree and the root product listing
    /// 3. sync products against the map from (1)
    /// 4. rebuild the map, so products created in (3) become linkable
    /// 5. sync the category tree against the map from (4)
    ///
    /// Category sync requires a map built *after* product sync: a map from
    /// before (3) would leave every newly created product out of the
    /// collections.
    pub async fn run(&self) -> Result<MigrationReport, SyncError> {
        let identity = self.map_destination().await?;
        let mapped_before = identity.len();

        let root = self
            .source
            .category_tree()
            .await?
            .ok_or(SyncError::Missing("category tree"))?;
        let listing = self
            .source
            .catalog_products(root.id)
            .await?
            .ok_or(SyncError::Missing("product listing"))?;
        tracing::info!(root_category = root.id, products = listing.len(), "source catalog loaded");

        let products = ProductSync::new(self.source, self.destination, self.throttle, &self.normalizer)
            .start_at(self.settings.start_at)
            .run(&listing, &identity)
            .await?;

        // Postcondition of product sync: `identity` is stale.
        let identity = self.map_destination().await?;
        let mapped_after = identity.len();

        let categories = CategorySync::new(self.source, self.destination, self.throttle)
            .excluding(self.settings.excluded_category)
            .run(&root, &identity)
            .await?;

        Ok(MigrationReport {
            mapped_before,
            mapped_after,
            products,
            categories,
        })
    }

    async fn map_destination(&self) -> Result<IdentityMap, SyncError> {
        Ok(IdentityMap::build(self.destination, self.throttle, self.settings.page_size).await?)
    }
}
