use std::time::Duration;

use catalog_sync::{
    CatalogSource, CategoryDetail, CategoryNode, CategoryProductLink, SourceError, SourceProduct,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{ApiClient, DEFAULT_TIMEOUT};
use crate::snapshot::SnapshotStore;

/// Connection settings for the source REST API.
#[derive(Debug, Clone)]
pub struct MagentoConfig {
    /// Store root, e.g. `https://magento.example`. `/rest/V1/` is appended.
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl MagentoConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn rest_base(&self) -> String {
        format!("{}/rest/V1/", self.base_url.trim_end_matches('/'))
    }
}

/// Reads the source catalog and snapshots what it reads.
pub struct MagentoSource {
    client: ApiClient,
    snapshots: SnapshotStore,
}

impl MagentoSource {
    pub fn new(config: &MagentoConfig, snapshots: SnapshotStore) -> Result<Self, SourceError> {
        let client = ApiClient::bearer(&config.rest_base(), &config.token, config.timeout)
            .map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(Self { client, snapshots })
    }

    /// GET `key` from the source.
    ///
    /// Non-200 answers are logged and yield `None`. With `persist`, the raw
    /// payload is written to the snapshot named `folder`, or `key` when no
    /// folder is given.
    pub async fn fetch(
        &self,
        key: &str,
        folder: Option<&str>,
        persist: bool,
    ) -> Result<Option<Value>, SourceError> {
        let response = self
            .client
            .get(key)
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if response.status.as_u16() != 200 {
            tracing::error!(
                key,
                status = response.status.as_u16(),
                body = %response.body_text(),
                "source fetch failed"
            );
            return Ok(None);
        }

        if persist {
            self.snapshot(folder.unwrap_or(key), &response.body).await?;
        }

        Ok(Some(response.body))
    }

    async fn snapshot(&self, name: &str, payload: &Value) -> Result<(), SourceError> {
        self.snapshots
            .save(name, payload)
            .await
            .map_err(|e| SourceError::Snapshot(e.to_string()))?;
        Ok(())
    }

    async fn fetch_as<T: DeserializeOwned>(
        &self,
        key: &str,
        folder: Option<&str>,
        persist: bool,
    ) -> Result<Option<T>, SourceError> {
        self.fetch(key, folder, persist)
            .await?
            .map(|value| decode(key, value))
            .transpose()
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, SourceError> {
    serde_json::from_value(value).map_err(|e| SourceError::Parse(format!("{key}: {e}")))
}

#[async_trait::async_trait]
impl CatalogSource for MagentoSource {
    async fn category_tree(&self) -> Result<Option<CategoryNode>, SourceError> {
        self.fetch_as("categories", None, true).await
    }

    async fn catalog_products(
        &self,
        category_id: u64,
    ) -> Result<Option<Vec<CategoryProductLink>>, SourceError> {
        self.fetch_as(
            &format!("categories/{category_id}/products"),
            Some("products"),
            true,
        )
        .await
    }

    async fn product(&self, sku: &str) -> Result<Option<SourceProduct>, SourceError> {
        let key = self
            .client
            .segment_path(&["products", sku])
            .map_err(|e| SourceError::Network(e.to_string()))?;
        self.fetch_as(&key, None, true).await
    }

    async fn category_detail(
        &self,
        category_id: u64,
    ) -> Result<Option<CategoryDetail>, SourceError> {
        let key = format!("categories/{category_id}");

        let Some(mut detail) = self.fetch(&key, None, false).await? else {
            return Ok(None);
        };

        let members = self
            .fetch(&format!("{key}/products"), None, false)
            .await?
            .unwrap_or_else(|| {
                tracing::warn!(category_id, "category membership unavailable, treating as empty");
                Value::Array(Vec::new())
            });

        match &mut detail {
            Value::Object(fields) => {
                fields.insert("products".to_owned(), members);
            }
            _ => {
                return Err(SourceError::Parse(format!(
                    "{key}: expected a JSON object"
                )));
            }
        }

        self.snapshot(&key, &detail).await?;
        decode(&key, detail).map(Some)
    }
}
