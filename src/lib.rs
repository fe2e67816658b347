//! regcache library
//!
//! A local, disk-persisted cache of a package registry listing, refreshed on
//! a TTL and revalidated cheaply with etag-based conditional requests.

pub mod cache;
pub mod cli;
pub mod logging;
pub mod projection;
pub mod refresh;
pub mod registry;

pub use cache::{CacheConfig, CacheError, CacheRecord, RegistryCache, UpdateOutcome};
pub use projection::{FieldSpec, ProjectionError, Transform};
pub use registry::{FetchOutcome, HttpRegistryClient, RegistryClient, RegistryError};
