use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Destination-side product handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination-side variant handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub u64);

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a source resource's extensible attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAttribute {
    pub attribute_code: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A node of the source category tree as returned by `GET categories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub children_data: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn is_leaf(&self) -> bool {
        self.children_data.is_empty()
    }
}

/// Membership entry from `GET categories/{id}/products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProductLink {
    pub sku: String,
    #[serde(default)]
    pub position: Option<i64>,
}

/// Full category detail joined with its product membership list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetail {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
    #[serde(default)]
    pub products: Vec<CategoryProductLink>,
}

/// A media gallery entry; `file` is relative to the configured image folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaGalleryEntry {
    pub file: String,
}

/// Full product detail from `GET products/{sku}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProduct {
    #[serde(default)]
    pub id: u64,
    pub sku: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
    #[serde(default)]
    pub media_gallery_entries: Vec<MediaGalleryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// SKU of the first variant, which is the join key against the source.
    pub fn primary_sku(&self) -> Option<&str> {
        self.variants.first()?.sku.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDraft {
    pub sku: String,
    pub price: f64,
}

/// Payload for creating a destination product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub body_html: String,
    pub images: Vec<ImageSource>,
    pub variants: Vec<VariantDraft>,
}

/// Title/body write for an existing product. Price travels separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub title: String,
    pub body_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPriceUpdate {
    pub id: VariantId,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collect {
    pub product_id: ProductId,
}

/// Payload for creating a custom collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDraft {
    pub title: String,
    pub body_html: String,
    pub collects: Vec<Collect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: u64,
    #[serde(default)]
    pub title: String,
}
