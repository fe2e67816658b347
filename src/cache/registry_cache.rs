//! The cache orchestrator
//!
//! [`RegistryCache`] owns the in-memory copy of the cache record. It loads
//! the record file at construction, refreshes immediately when the record is
//! stale, and then revalidates every TTL on a background task. Updates are
//! serialized per instance, and the in-memory copy only changes after the
//! new record has been written to disk.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{is_stale_now, CacheConfig, CacheError, CacheFile, CacheRecord};
use crate::projection::FieldSpec;
use crate::refresh::{RefreshConfig, RefreshHandle};
use crate::registry::{FetchOutcome, RegistryClient};

/// What a successful update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The registry sent a new listing (200)
    Updated,
    /// The listing was still current (304); only the timestamp moved
    Unchanged,
}

/// State shared between the cache handle and its background tasks
struct Inner {
    client: Arc<dyn RegistryClient>,
    fields: FieldSpec,
    file: CacheFile,
    mirror: watch::Sender<Arc<CacheRecord>>,
    /// Held for a whole update so forced and scheduled runs never overlap
    update_lock: Mutex<()>,
}

impl Inner {
    async fn update(&self) -> Result<UpdateOutcome, CacheError> {
        let _guard = self.update_lock.lock().await;
        let current = Arc::clone(&self.mirror.borrow());

        let (next, outcome) = match self.client.conditional_get(current.etag.as_deref()).await? {
            FetchOutcome::Modified { body, etag } => {
                let items = self.fields.project(&body)?;
                (CacheRecord::fetched(etag, items), UpdateOutcome::Updated)
            }
            FetchOutcome::NotModified => (current.revalidated(), UpdateOutcome::Unchanged),
            FetchOutcome::Unexpected(status) => return Err(CacheError::UnexpectedStatus(status)),
        };

        let file = self.file.clone();
        let next = tokio::task::spawn_blocking(move || file.write(&next).map(|()| next))
            .await?
            .map_err(|source| CacheError::Persist {
                path: self.file.path().to_path_buf(),
                source,
            })?;

        let item_count = next.items.len();
        self.mirror.send_replace(Arc::new(next));

        match outcome {
            UpdateOutcome::Updated => info!(items = item_count, "registry listing updated"),
            UpdateOutcome::Unchanged => debug!(items = item_count, "registry listing unchanged"),
        }
        Ok(outcome)
    }

    /// Runs an update and reports failures on the log
    async fn update_logged(&self) -> Result<UpdateOutcome, CacheError> {
        let result = self.update().await;
        if let Err(e) = &result {
            warn!(path = %self.file.path().display(), error = %e, "cache update failed, keeping previous listing");
        }
        result
    }
}

/// A disk-persisted, periodically revalidated registry listing
///
/// Each instance owns its record file and in-memory copy; there is no
/// process-wide state, so differently configured caches can coexist.
/// Dropping the instance stops background revalidation.
pub struct RegistryCache {
    inner: Arc<Inner>,
    ttl: Duration,
    refresh: RefreshHandle,
}

impl RegistryCache {
    /// Loads the cache and starts background revalidation
    ///
    /// If the record is stale, the first refresh runs on the background task,
    /// so [`get`](Self::get) may still return the old (or empty) listing right
    /// after this returns. Must be called from within a tokio runtime.
    pub fn spawn<C>(config: CacheConfig, client: C) -> Result<Self, CacheError>
    where
        C: RegistryClient + 'static,
    {
        let (inner, needs_refresh) = Self::load(&config, Arc::new(client))?;
        Ok(Self::schedule(inner, config.ttl, needs_refresh))
    }

    /// Loads the cache, waits for the startup refresh if one is due, then
    /// starts background revalidation
    ///
    /// A failed startup refresh is logged and the cached listing is kept.
    pub async fn open<C>(config: CacheConfig, client: C) -> Result<Self, CacheError>
    where
        C: RegistryClient + 'static,
    {
        let (inner, needs_refresh) = Self::load(&config, Arc::new(client))?;
        if needs_refresh {
            let _ = inner.update_logged().await;
        }
        Ok(Self::schedule(inner, config.ttl, false))
    }

    fn load(
        config: &CacheConfig,
        client: Arc<dyn RegistryClient>,
    ) -> Result<(Arc<Inner>, bool), CacheError> {
        let file = config.cache_file()?;
        let record = file.read();
        let needs_refresh = config.refresh_on_start || is_stale_now(record.timestamp, config.ttl);
        debug!(
            path = %file.path().display(),
            items = record.items.len(),
            needs_refresh,
            "cache loaded"
        );

        let (mirror, _) = watch::channel(Arc::new(record));
        let inner = Arc::new(Inner {
            client,
            fields: config.fields.clone(),
            file,
            mirror,
            update_lock: Mutex::new(()),
        });
        Ok((inner, needs_refresh))
    }

    fn schedule(inner: Arc<Inner>, ttl: Duration, run_immediately: bool) -> Self {
        let job_inner = Arc::clone(&inner);
        let refresh = RefreshHandle::spawn(
            RefreshConfig {
                interval: ttl,
                run_immediately,
            },
            move || {
                let inner = Arc::clone(&job_inner);
                async move {
                    let _ = inner.update_logged().await;
                }
            },
        );
        Self {
            inner,
            ttl,
            refresh,
        }
    }

    /// Current items; empty until the first successful fetch
    pub fn get(&self) -> Vec<Value> {
        self.inner.mirror.borrow().items.clone()
    }

    /// The whole in-memory record without copying the items
    pub fn snapshot(&self) -> Arc<CacheRecord> {
        Arc::clone(&self.inner.mirror.borrow())
    }

    /// Receiver notified each time a validated record is swapped in
    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheRecord>> {
        self.inner.mirror.subscribe()
    }

    /// Starts a refresh now, regardless of staleness
    ///
    /// The refresh runs on its own task; await the handle to observe its
    /// result. Failures are also logged.
    pub fn force_update(&self) -> JoinHandle<Result<UpdateOutcome, CacheError>> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.update_logged().await })
    }

    /// Location of the record file
    pub fn path(&self) -> &Path {
        self.inner.file.path()
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stops background revalidation, waiting for an in-flight run
    pub async fn shutdown(self) {
        self.refresh.shutdown().await;
    }
}
