//! Disk-persisted registry listing cache
//!
//! This module ties together the record file, the staleness check, and the
//! [`RegistryCache`] orchestrator that keeps the listing current through
//! conditional requests and periodic revalidation. A missing or unreadable
//! cache file is a cold start, not an error; stale data keeps being served
//! whenever the registry cannot be reached.

mod file;
mod freshness;
mod record;
mod registry_cache;

pub use file::{default_cache_dir, CacheFile};
pub use freshness::{is_stale, is_stale_now};
pub use record::CacheRecord;
pub use registry_cache::{RegistryCache, UpdateOutcome};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::projection::{FieldSpec, ProjectionError};
use crate::registry::RegistryError;

/// Default time-to-live of a validated listing
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);

/// Errors produced by the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// No cache directory was configured and the platform has none
    #[error("Could not determine a cache directory")]
    NoCacheDirectory,

    /// The projection has no stable identifier to name its cache file
    #[error("Transform projections need a non-empty identifier")]
    UnstableCacheKey,

    /// The registry request failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The registry answered with a status other than 200 or 304
    #[error("Unexpected status code {0}")]
    UnexpectedStatus(u16),

    /// Projecting the listing failed
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// Writing the cache file failed
    #[error("Could not save cache {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The update task panicked or was cancelled
    #[error("Update task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Cache configuration, fixed for the lifetime of a [`RegistryCache`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a validated listing stays fresh; zero disables revalidation
    pub ttl: Duration,
    /// Shape of the cached items
    pub fields: FieldSpec,
    /// Root directory for cache files; the platform cache dir when `None`
    pub cache_dir: Option<PathBuf>,
    /// Refresh at startup even if the record is still fresh
    pub refresh_on_start: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            fields: FieldSpec::AllKeys,
            cache_dir: None,
            refresh_on_start: false,
        }
    }
}

impl CacheConfig {
    /// Sets the time-to-live
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the projection
    pub fn with_fields(mut self, fields: FieldSpec) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the cache root directory
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    /// Forces a refresh at startup
    pub fn with_refresh_on_start(mut self, refresh_on_start: bool) -> Self {
        self.refresh_on_start = refresh_on_start;
        self
    }

    /// Resolves the record file for this configuration
    pub fn cache_file(&self) -> Result<CacheFile, CacheError> {
        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir().ok_or(CacheError::NoCacheDirectory)?,
        };
        CacheFile::for_fields(&cache_dir, &self.fields)
    }
}
