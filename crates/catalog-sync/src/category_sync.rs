use crate::destination::CatalogDestination;
use crate::identity::IdentityMap;
use crate::model::{CategoryDetail, CategoryNode, Collect, CollectionDraft};
use crate::normalize;
use crate::source::CatalogSource;
use crate::sync::{ItemFailure, SyncError};
use crate::throttle::Throttle;

/// One node of the category tree, in the order it will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryVisit {
    pub id: u64,
    pub name: String,
    pub depth: usize,
    /// Position among the parent's children. Zero for the root.
    pub sibling_index: usize,
    pub is_leaf: bool,
}

/// Flatten the tree depth-first, preserving sibling order.
///
/// The `excluded` category and its whole subtree are left out.
pub fn plan_visits(root: &CategoryNode, excluded: Option<u64>) -> Vec<CategoryVisit> {
    let mut visits = Vec::new();
    collect_visits(root, excluded, 0, 0, &mut visits);
    visits
}

fn collect_visits(
    node: &CategoryNode,
    excluded: Option<u64>,
    depth: usize,
    sibling_index: usize,
    visits: &mut Vec<CategoryVisit>,
) {
    if excluded == Some(node.id) {
        return;
    }

    visits.push(CategoryVisit {
        id: node.id,
        name: node.name.clone(),
        depth,
        sibling_index,
        is_leaf: node.is_leaf(),
    });

    for (index, child) in node.children_data.iter().enumerate() {
        collect_visits(child, excluded, depth + 1, index, visits);
    }
}

/// Membership links for a category. Only leaves carry members; membership
/// is never rolled up from descendants.
///
/// Returns the collects plus the member SKUs that have no destination
/// product.
pub fn build_collects(
    visit: &CategoryVisit,
    detail: &CategoryDetail,
    identity: &IdentityMap,
) -> (Vec<Collect>, Vec<String>) {
    if !visit.is_leaf {
        return (Vec::new(), Vec::new());
    }

    let mut collects = Vec::with_capacity(detail.products.len());
    let mut unmapped = Vec::new();

    for member in &detail.products {
        match identity.get(&member.sku) {
            Some(product_id) => collects.push(Collect { product_id }),
            None => unmapped.push(member.sku.clone()),
        }
    }

    (collects, unmapped)
}

/// Outcome counts for a category sync pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySyncReport {
    pub created: u64,
    pub failed: u64,
    /// Leaf members that could not be linked, as `(category id, sku)`.
    pub unmapped: Vec<(u64, String)>,
    pub failures: Vec<ItemFailure>,
}

/// Mirrors the source category tree as flat destination collections.
///
/// There is no update path: every run creates a fresh collection per
/// visited category.
pub struct CategorySync<'a> {
    source: &'a dyn CatalogSource,
    destination: &'a dyn CatalogDestination,
    throttle: &'a dyn Throttle,
    excluded: Option<u64>,
}

impl<'a> CategorySync<'a> {
    pub fn new(
        source: &'a dyn CatalogSource,
        destination: &'a dyn CatalogDestination,
        throttle: &'a dyn Throttle,
    ) -> Self {
        Self {
            source,
            destination,
            throttle,
            excluded: None,
        }
    }

    /// Leave this category and its subtree out of the migration.
    pub fn excluding(mut self, category_id: Option<u64>) -> Self {
        self.excluded = category_id;
        self
    }

    pub async fn run(
        &self,
        root: &CategoryNode,
        identity: &IdentityMap,
    ) -> Result<CategorySyncReport, SyncError> {
        let mut report = CategorySyncReport::default();

        for visit in plan_visits(root, self.excluded) {
            if visit.sibling_index > 0 {
                self.throttle.pause().await;
            }

            tracing::info!(category_id = visit.id, depth = visit.depth, "processing category");

            let fetched = match self.source.category_detail(visit.id).await {
                Ok(fetched) => fetched,
                Err(e) if e.is_item_scoped() => {
                    tracing::error!(category_id = visit.id, error = %e, "category detail unreadable, skipping");
                    report.failed += 1;
                    report
                        .failures
                        .push(ItemFailure::new(visit.id.to_string(), e.to_string()));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let Some(detail) = fetched else {
                tracing::warn!(category_id = visit.id, "category detail unavailable, skipping");
                report.failed += 1;
                report
                    .failures
                    .push(ItemFailure::new(visit.id.to_string(), "category detail unavailable"));
                continue;
            };

            let (collects, unmapped) = build_collects(&visit, &detail, identity);
            for sku in unmapped {
                tracing::warn!(category_id = visit.id, sku = %sku, "member SKU has no destination product");
                report.unmapped.push((visit.id, sku));
            }

            let draft = CollectionDraft {
                title: visit.name.clone(),
                body_html: normalize::description(&detail),
                collects,
            };

            match self.destination.create_collection(&draft).await {
                Ok(created) => {
                    match created {
                        Some(collection) => tracing::debug!(
                            category_id = visit.id,
                            collection_id = collection.id,
                            "collection created"
                        ),
                        None => tracing::warn!(
                            category_id = visit.id,
                            "collection created but response unreadable"
                        ),
                    }
                    report.created += 1;
                }
                Err(e) if e.is_item_scoped() => {
                    tracing::error!(category_id = visit.id, error = %e, "collection create failed");
                    report.failed += 1;
                    report
                        .failures
                        .push(ItemFailure::new(visit.id.to_string(), e.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            created = report.created,
            failed = report.failed,
            unmapped = report.unmapped.len(),
            "category sync complete"
        );

        Ok(report)
    }
}
