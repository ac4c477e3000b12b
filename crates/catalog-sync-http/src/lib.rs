pub mod client;
pub mod magento;
pub mod shopify;
pub mod snapshot;

pub use client::{ApiClient, ApiResponse, ClientError};
pub use magento::{MagentoConfig, MagentoSource};
pub use shopify::{ShopifyConfig, ShopifyDestination};
pub use snapshot::{SnapshotError, SnapshotStore};
