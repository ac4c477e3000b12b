use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Upper bound on any single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors that mean the request itself failed.
///
/// Statuses below 500 are not errors here; callers inspect them on the
/// returned `ApiResponse`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid credential header: {0}")]
    InvalidHeader(String),

    #[error("failed to build HTTP client: {0}")]
    Build(String),

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} answered HTTP {status}: {body}")]
    Server {
        url: String,
        status: u16,
        body: String,
    },
}

/// A completed request with a status below 500.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Parsed JSON body. Empty bodies are `Null`; non-JSON bodies are kept
    /// as a JSON string.
    pub body: Value,
    pub headers: HeaderMap,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Body rendered for log lines.
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// JSON-over-HTTP client for one backend: a base URL, one credential
/// header, and a bounded timeout.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        auth_header: &str,
        auth_value: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = parse_base(base_url)?;

        let mut value = HeaderValue::from_str(auth_value)
            .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);

        let name = HeaderName::from_bytes(auth_header.as_bytes())
            .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(name, value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent("catalog-sync")
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// `Authorization: Bearer <token>`.
    pub fn bearer(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ClientError> {
        Self::new(base_url, "authorization", &format!("Bearer {token}"), timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path against the base URL. Absolute URLs pass through.
    pub fn resolve(&self, path: &str) -> Result<Url, ClientError> {
        let resolved = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)
        } else {
            self.base_url.join(path.trim_start_matches('/'))
        };

        resolved.map_err(|e| ClientError::InvalidUrl {
            url: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Path relative to the base URL built from `segments`, each one
    /// percent-encoded so `/`, `?` and `#` stay inside its segment.
    pub fn segment_path(&self, segments: &[&str]) -> Result<String, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "base URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .extend(segments);

        let path = url.path();
        Ok(path
            .strip_prefix(self.base_url.path())
            .unwrap_or(path)
            .to_owned())
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.resolve(path)?;

        let mut req = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            req = req.json(body);
        }

        let transport = |e: reqwest::Error| ClientError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = req.send().await.map_err(transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(transport)?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        tracing::debug!(%method, %url, status = status.as_u16(), "request complete");

        if status.is_server_error() {
            return Err(ClientError::Server {
                url: url.to_string(),
                status: status.as_u16(),
                body: match body {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
            });
        }

        Ok(ApiResponse {
            status,
            body,
            headers,
        })
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ClientError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse, ClientError> {
        self.request(Method::PUT, path, Some(body)).await
    }
}

/// Parse a base URL, forcing a trailing slash so relative joins append.
fn parse_base(base_url: &str) -> Result<Url, ClientError> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_owned()
    } else {
        format!("{base_url}/")
    };

    Url::parse(&normalized).map_err(|e| ClientError::InvalidUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}
