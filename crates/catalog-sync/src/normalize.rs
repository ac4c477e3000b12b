//! Cleanup of source content before it is written to the destination.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{CategoryDetail, CustomAttribute, ImageSource, SourceProduct};

static TEMPLATE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^}]+\}\}").expect("template marker pattern is valid"));

const DESCRIPTION_ATTRIBUTE: &str = "description";

/// A source resource carrying an extensible attribute set.
pub trait Attributed {
    fn resource_id(&self) -> u64;
    fn custom_attributes(&self) -> &[CustomAttribute];
}

impl Attributed for SourceProduct {
    fn resource_id(&self) -> u64 {
        self.id
    }

    fn custom_attributes(&self) -> &[CustomAttribute] {
        &self.custom_attributes
    }
}

impl Attributed for CategoryDetail {
    fn resource_id(&self) -> u64 {
        self.id
    }

    fn custom_attributes(&self) -> &[CustomAttribute] {
        &self.custom_attributes
    }
}

/// Remove every `{{ ... }}` marker. Returns `None` when the text had none.
///
/// Markers are dropped, not resolved; the surrounding text is left as is.
pub fn strip_template_markers(text: &str) -> Option<String> {
    if !TEMPLATE_MARKER.is_match(text) {
        return None;
    }
    Some(TEMPLATE_MARKER.replace_all(text, "").into_owned())
}

/// The resource's `description` attribute with template markers stripped,
/// or an empty string when the attribute is absent or not text.
pub fn description(resource: &impl Attributed) -> String {
    let Some(raw) = resource
        .custom_attributes()
        .iter()
        .find(|attr| attr.attribute_code == DESCRIPTION_ATTRIBUTE)
        .and_then(|attr| attr.value.as_str())
    else {
        return String::new();
    };

    match strip_template_markers(raw) {
        Some(stripped) => {
            tracing::warn!(
                resource_id = resource.resource_id(),
                "description contained template markers; stripped"
            );
            stripped
        }
        None => raw.to_owned(),
    }
}

/// Turns relative media references into absolute image URLs.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    base_url: String,
    image_folder: String,
}

impl Normalizer {
    pub fn new(base_url: impl Into<String>, image_folder: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            image_folder: image_folder.into(),
        }
    }

    /// One image per gallery entry, in gallery order.
    pub fn images(&self, product: &SourceProduct) -> Vec<ImageSource> {
        product
            .media_gallery_entries
            .iter()
            .map(|entry| ImageSource {
                src: format!("{}{}{}", self.base_url, self.image_folder, entry.file),
            })
            .collect()
    }
}
