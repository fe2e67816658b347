//! regcache - Print a cached copy of the package registry listing
//!
//! Opens the cache for the requested projection, refreshes it when stale,
//! and prints the items as a JSON array. With `--watch` it stays up and keeps
//! revalidating every TTL.

use std::io::{self, Write};

use clap::Parser;
use tracing::{info, warn};

use regcache::cli::{Cli, StartupConfig};
use regcache::{logging, HttpRegistryClient, RegistryCache};

/// Writes the current items to stdout as pretty JSON
fn print_items(cache: &RegistryCache) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&cache.get())?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

/// Logs every revalidation until Ctrl-C
async fn watch(cache: &RegistryCache) {
    if cache.ttl().is_zero() {
        warn!("--watch with a zero TTL never revalidates");
    }

    let mut updates = cache.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let record = updates.borrow_and_update().clone();
                info!(items = record.items.len(), etag = ?record.etag, "listing revalidated");
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = StartupConfig::from_cli(&cli)?;
    logging::init(config.verbosity);

    let client = match config.timeout {
        Some(timeout) => HttpRegistryClient::with_timeout(timeout)?,
        None => HttpRegistryClient::new(),
    }
    .with_url(&config.registry_url);

    let cache = RegistryCache::open(config.cache, client).await?;
    info!(path = %cache.path().display(), "using cache file");
    print_items(&cache)?;

    if config.watch {
        watch(&cache).await;
    }

    cache.shutdown().await;
    Ok(())
}
