pub mod category_sync;
pub mod destination;
pub mod identity;
pub mod link;
pub mod migration;
pub mod model;
pub mod normalize;
pub mod product_sync;
pub mod source;
pub mod sync;
pub mod throttle;

pub use category_sync::{CategorySync, CategorySyncReport, CategoryVisit, plan_visits};
pub use destination::{CatalogDestination, DestinationError, ProductPage};
pub use identity::IdentityMap;
pub use link::{LinkHeaderError, parse_link_header};
pub use migration::{Migration, MigrationReport, MigrationSettings};
pub use model::{
    CategoryDetail, CategoryNode, CategoryProductLink, Collect, Collection, CollectionDraft,
    CustomAttribute, ImageSource, MediaGalleryEntry, Product, ProductDraft, ProductId,
    ProductUpdate, SourceProduct, Variant, VariantDraft, VariantId, VariantPriceUpdate,
};
pub use normalize::{Attributed, Normalizer, description, strip_template_markers};
pub use product_sync::{ProductAction, ProductSync, ProductSyncReport, plan_product};
pub use source::{CatalogSource, SourceError};
pub use sync::{ItemFailure, SyncError};
pub use throttle::{FixedDelay, NoDelay, Throttle};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
