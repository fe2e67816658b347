//! On-disk storage for the cache record
//!
//! One JSON file per projection, stored under `<cache dir>/caches/`. The file
//! name is a digest of the projection's cache key, so caches with different
//! field selections never share a file.

use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{CacheError, CacheRecord};
use crate::projection::FieldSpec;

/// Subdirectory of the cache root holding record files
const CACHES_DIR: &str = "caches";

/// Returns the platform cache directory for regcache
///
/// Uses `~/.cache/regcache/` on Linux, or the equivalent on other platforms.
/// Returns `None` if it cannot be determined (e.g., no home directory).
pub fn default_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "regcache")?;
    Some(project_dirs.cache_dir().to_path_buf())
}

/// Reads and writes the record file of one projection
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    /// Derives the record file location for `fields` under `cache_dir`
    ///
    /// Fails when a transform carries no identifier, since its cache would
    /// collide with every other unnamed transform.
    pub fn for_fields(cache_dir: &Path, fields: &FieldSpec) -> Result<Self, CacheError> {
        if let FieldSpec::Transform(transform) = fields {
            if transform.id().trim().is_empty() {
                return Err(CacheError::UnstableCacheKey);
            }
        }

        let hash = Sha256::digest(fields.cache_key().as_bytes());
        let file_name = format!("{}.json", hex::encode(&hash[..16]));
        Ok(Self {
            path: cache_dir.join(CACHES_DIR).join(file_name),
        })
    }

    /// Location of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the record, or an empty one if the file is missing or unreadable
    pub fn read(&self) -> CacheRecord {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no cache file, starting cold");
                return CacheRecord::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!(path = %self.path.display(), error = %e, "unparsable cache file, starting cold");
            CacheRecord::default()
        })
    }

    /// Persists the record
    ///
    /// The JSON is written to a sibling temporary file which is then renamed
    /// over the target, so readers see either the old or the new record.
    pub fn write(&self, record: &CacheRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path).inspect_err(|_| {
            let _ = fs::remove_file(&tmp_path);
        })
    }
}
