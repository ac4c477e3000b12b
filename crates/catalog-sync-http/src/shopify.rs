use std::time::Duration;

use catalog_sync::link::next_link;
use catalog_sync::{
    CatalogDestination, Collection, CollectionDraft, DestinationError, Product, ProductDraft,
    ProductId, ProductPage, ProductUpdate, Variant, VariantPriceUpdate,
};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::client::{ApiClient, ApiResponse, ClientError, DEFAULT_TIMEOUT};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Connection settings for the destination Admin REST API.
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Versioned API root, e.g. `https://shop.myshopify.com/admin/api/2024-01/`.
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl ShopifyConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Deserialize)]
struct ProductList {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Deserialize)]
struct ProductEnvelope {
    product: Product,
}

#[derive(Deserialize)]
struct VariantEnvelope {
    variant: Variant,
}

#[derive(Deserialize)]
struct CollectionEnvelope {
    custom_collection: Collection,
}

/// Writes the migrated catalog through the destination REST API.
pub struct ShopifyDestination {
    client: ApiClient,
}

impl ShopifyDestination {
    pub fn new(config: &ShopifyConfig) -> Result<Self, DestinationError> {
        let client = ApiClient::new(
            &config.base_url,
            ACCESS_TOKEN_HEADER,
            &config.token,
            config.timeout,
        )
        .map_err(transport)?;
        Ok(Self { client })
    }

    /// Send a write. Any non-success status is a rejection.
    async fn write(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        payload: Value,
    ) -> Result<ApiResponse, DestinationError> {
        let response = self
            .client
            .request(method, path, Some(&payload))
            .await
            .map_err(transport)?;

        if !response.is_success() {
            let status = response.status.as_u16();
            let body = response.body_text();
            tracing::warn!(operation, status, body = %body, "destination rejected write");
            return Err(DestinationError::Rejected { status, body });
        }

        Ok(response)
    }

    /// Send a write whose response envelope the caller needs.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        payload: Value,
    ) -> Result<T, DestinationError> {
        self.write(operation, method, path, payload)
            .await?
            .json()
            .map_err(|e| DestinationError::Parse(format!("{operation}: {e}")))
    }

    /// Send a create. The write stands even when its response cannot be read.
    async fn create<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        payload: Value,
    ) -> Result<Option<T>, DestinationError> {
        let response = self.write(operation, Method::POST, path, payload).await?;

        match response.json() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                tracing::warn!(
                    operation,
                    status = response.status.as_u16(),
                    error = %e,
                    "write accepted but response unreadable"
                );
                Ok(None)
            }
        }
    }
}

fn transport(e: ClientError) -> DestinationError {
    DestinationError::Transport(e.to_string())
}

#[async_trait::async_trait]
impl CatalogDestination for ShopifyDestination {
    async fn list_products(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ProductPage, DestinationError> {
        let path = match cursor {
            Some(next) => next.to_owned(),
            None => format!("products.json?limit={page_size}"),
        };

        let response = self.client.get(&path).await.map_err(transport)?;

        if !response.is_success() {
            return Err(DestinationError::Rejected {
                status: response.status.as_u16(),
                body: response.body_text(),
            });
        }

        let next = match response.header("link") {
            Some(header) => next_link(header)?,
            None => None,
        };

        let list: ProductList = response
            .json()
            .map_err(|e| DestinationError::Parse(format!("product listing: {e}")))?;

        tracing::debug!(count = list.products.len(), has_next = next.is_some(), "product page fetched");

        Ok(ProductPage {
            products: list.products,
            next,
        })
    }

    async fn create_product(
        &self,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, DestinationError> {
        let envelope: Option<ProductEnvelope> = self
            .create("create product", "products.json", json!({ "product": draft }))
            .await?;
        Ok(envelope.map(|e| e.product))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, DestinationError> {
        let envelope: ProductEnvelope = self
            .send(
                "update product",
                Method::PUT,
                &format!("products/{id}.json"),
                json!({ "product": update }),
            )
            .await?;
        Ok(envelope.product)
    }

    async fn update_variant(
        &self,
        update: &VariantPriceUpdate,
    ) -> Result<Variant, DestinationError> {
        let envelope: VariantEnvelope = self
            .send(
                "update variant",
                Method::PUT,
                &format!("variants/{}.json", update.id),
                json!({ "variant": update }),
            )
            .await?;
        Ok(envelope.variant)
    }

    async fn create_collection(
        &self,
        draft: &CollectionDraft,
    ) -> Result<Option<Collection>, DestinationError> {
        let envelope: Option<CollectionEnvelope> = self
            .create(
                "create collection",
                "custom_collections.json",
                json!({ "custom_collection": draft }),
            )
            .await?;
        Ok(envelope.map(|e| e.custom_collection))
    }
}
