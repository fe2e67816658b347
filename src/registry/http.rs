//! reqwest-backed registry client
//!
//! Issues a gzip-compressed GET against the registry's "all packages"
//! endpoint, carrying the last known etag so an unchanged listing costs a
//! 304 instead of a full download.

use async_trait::async_trait;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{FetchOutcome, RegistryClient, RegistryError};

/// Default listing endpoint (npm)
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org/-/all";

/// Client for the registry listing endpoint
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    client: Client,
    url: String,
}

impl Default for HttpRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRegistryClient {
    /// Create a client for the default registry
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }

    /// Create a client with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }

    /// Create a client with a request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Point the client at another listing URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The listing URL requests are sent to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn conditional_get(&self, etag: Option<&str>) -> Result<FetchOutcome, RegistryError> {
        let mut request = self.client.get(&self.url);
        if let Some(etag) = etag.filter(|etag| !etag.is_empty()) {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url = %self.url, status = status.as_u16(), "registry responded");

        match status {
            StatusCode::OK => {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let text = response.text().await?;
                match serde_json::from_str::<Value>(&text) {
                    Ok(Value::Object(body)) => Ok(FetchOutcome::Modified { body, etag }),
                    Ok(_) => Err(RegistryError::UnexpectedBody(
                        "listing is not a JSON object".to_string(),
                    )),
                    Err(e) => Err(RegistryError::UnexpectedBody(e.to_string())),
                }
            }
            StatusCode::NOT_MODIFIED => Ok(FetchOutcome::NotModified),
            other => Ok(FetchOutcome::Unexpected(other.as_u16())),
        }
    }
}
