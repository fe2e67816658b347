//! Registry access
//!
//! The cache only needs one operation from the registry: a conditional GET
//! of the full package listing. [`RegistryClient`] is that seam, and
//! [`HttpRegistryClient`] is the reqwest-backed implementation.

mod http;

pub use http::{HttpRegistryClient, DEFAULT_REGISTRY_URL};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur when talking to the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The listing body was not a JSON object
    #[error("Unexpected registry body: {0}")]
    UnexpectedBody(String),
}

/// Result of a conditional GET
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 200: a fresh listing keyed by package name
    Modified {
        body: Map<String, Value>,
        etag: Option<String>,
    },
    /// 304: the cached listing is still current
    NotModified,
    /// Any other status code
    Unexpected(u16),
}

/// Conditional access to the registry listing
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetches the listing, sending `etag` as `If-None-Match` when present
    async fn conditional_get(&self, etag: Option<&str>) -> Result<FetchOutcome, RegistryError>;
}
