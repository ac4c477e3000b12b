use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Endpoints and credentials, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub magento_url: String,
    pub magento_token: String,
    pub shopify_url: String,
    pub shopify_token: String,
    /// Prefix placed between the store URL and each gallery file.
    pub image_folder: String,
    /// Category left out of the collection sync, with its subtree.
    pub excluded_category: Option<u64>,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| -> Result<String> {
            match optional(key) {
                Some(value) => Ok(value),
                None => bail!("{key} must be set"),
            }
        };

        let excluded_category = match optional("MAGENTO_CATEGORY_ID_TO_IGNORE") {
            Some(raw) => Some(raw.trim().parse::<u64>().with_context(|| {
                format!("MAGENTO_CATEGORY_ID_TO_IGNORE is not a category id: {raw:?}")
            })?),
            None => None,
        };

        Ok(Self {
            magento_url: required("MAGENTO_URL")?,
            magento_token: required("MAGENTO_API_TOKEN")?,
            shopify_url: required("SHOPIFY_API_URL")?,
            shopify_token: required("SHOPIFY_API_TOKEN")?,
            image_folder: optional("MAGENTO_PRODUCT_IMAGE_FOLDER").unwrap_or_default(),
            excluded_category,
        })
    }
}

/// Run tuning, from `settings.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub start_at: usize,
    pub page_size: u32,
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub data_dir: PathBuf,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            start_at: 0,
            page_size: 250,
            delay_ms: 2000,
            timeout_secs: 20,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl SyncSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings file path: `~/.config/catalog-sync/settings.toml`
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("catalog-sync").join("settings.toml"))
}

/// Load settings from `path` (or the default location), falling back to
/// defaults if the file is missing or unparseable.
pub fn load_settings(path: Option<&Path>) -> SyncSettings {
    let path = path.map(Path::to_path_buf).or_else(settings_path);

    if let Some(path) = path
        && let Ok(contents) = std::fs::read_to_string(&path)
    {
        match toml::from_str::<SyncSettings>(&contents) {
            Ok(settings) => return settings,
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse settings, using defaults"
            ),
        }
    }

    SyncSettings::default()
}
