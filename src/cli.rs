//! Command-line interface parsing for regcache
//!
//! Turns arguments into a [`StartupConfig`]: the cache configuration plus the
//! registry endpoint and run mode.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::projection::FieldSpec;
use crate::registry::DEFAULT_REGISTRY_URL;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A field list contained an empty name
    #[error("Invalid field list: '{0}'. Field names must not be empty")]
    EmptyField(String),
}

/// regcache - Cached, etag-validated registry package listing
#[derive(Parser, Debug)]
#[command(name = "regcache")]
#[command(about = "Print a locally cached copy of the package registry listing")]
#[command(version)]
pub struct Cli {
    /// Seconds a validated listing stays fresh (0 disables revalidation)
    #[arg(long, value_name = "SECONDS", default_value_t = 86400)]
    pub ttl_secs: u64,

    /// Comma-separated package fields to keep instead of package names
    ///
    /// Examples:
    ///   regcache                          # package names
    ///   regcache --fields name,version    # {"name": ..., "version": ...} objects
    #[arg(long, value_name = "FIELDS")]
    pub fields: Option<String>,

    /// Directory for cache files (defaults to the platform cache directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Registry listing URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Refresh from the registry even if the cache is fresh
    #[arg(long)]
    pub force: bool,

    /// Keep running and revalidate every TTL
    #[arg(long)]
    pub watch: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Cache configuration
    pub cache: CacheConfig,
    /// Registry listing URL
    pub registry_url: String,
    /// Optional request timeout
    pub timeout: Option<Duration>,
    /// Whether to keep revalidating after printing
    pub watch: bool,
    /// Log verbosity
    pub verbosity: u8,
}

/// Parses a `--fields` value into a projection.
///
/// # Arguments
/// * `s` - Comma-separated field names
///
/// # Returns
/// * `Ok(FieldSpec)` picking the named fields
/// * `Err(CliError::EmptyField)` if any name is blank
pub fn parse_fields_arg(s: &str) -> Result<FieldSpec, CliError> {
    let fields: Vec<&str> = s.split(',').map(str::trim).collect();
    if fields.iter().any(|field| field.is_empty()) {
        return Err(CliError::EmptyField(s.to_string()));
    }
    Ok(FieldSpec::pick(fields))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if the field list is malformed
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let fields = match &cli.fields {
            None => FieldSpec::AllKeys,
            Some(fields) => parse_fields_arg(fields)?,
        };

        let mut cache = CacheConfig::default()
            .with_ttl(Duration::from_secs(cli.ttl_secs))
            .with_fields(fields)
            .with_refresh_on_start(cli.force);
        if let Some(dir) = &cli.cache_dir {
            cache = cache.with_cache_dir(dir);
        }

        Ok(StartupConfig {
            cache,
            registry_url: cli.registry_url.clone(),
            timeout: cli.timeout_secs.map(Duration::from_secs),
            watch: cli.watch,
            verbosity: cli.verbose,
        })
    }
}
