//! TTL-bound disk cache for metadata: per-filter (tables, columns) blobs
//! plus an independent schema-name list.
//!
//! Freshness is judged against the `cached_at` stamp inside each entry,
//! never against file mtime. Every failure mode on the read side (missing
//! file, expired stamp, corrupt payload) collapses to a miss; the write
//! side degrades to a warning. A cache that misbehaves makes the app
//! slower, never broken.

mod blob;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::types::{ColumnInfo, SchemaInfo, TableInfo};
use crate::utils::config::{CacheConsts, PackagePaths};

/// Cache tuning. Defaults: 24h TTL, gzip on.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Entries whose `cached_at` is older than this read as misses.
    pub ttl: Duration,
    /// Write `.json.gz` instead of `.json`. Reading handles both.
    pub compress: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(CacheConsts::DEFAULT_TTL_SECS),
            compress: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct MetaEntry {
    cached_at: u64,
    schema_filter: Option<String>,
    tables: Vec<TableInfo>,
    columns: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SchemasEntry {
    cached_at: u64,
    schemas: Vec<SchemaInfo>,
}

/// Deterministic key for a load request: the filter (or `ALL_SCHEMAS`),
/// qualified with `_LIMIT{n}_OFFSET{m}` when a row cap is involved so
/// capped loads never collide with full ones. Offset defaults to 0.
pub fn cache_key(
    schema_filter: Option<&str>,
    limit: Option<usize>,
    offset: Option<usize>,
) -> String {
    let base = schema_filter.unwrap_or(CacheConsts::ALL_SCHEMAS_KEY);
    match limit {
        Some(n) => format!("{base}_LIMIT{n}_OFFSET{}", offset.unwrap_or(0)),
        None => base.to_string(),
    }
}

/// Platform cache directory for this package (`~/.cache/schemax` on
/// Linux), or None when the platform reports no cache root.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|base| base.join(PackagePaths::get().cache_dir_name()))
}

/// Blob store rooted at one directory. Constructed explicitly and passed
/// where needed; there is no global instance.
pub struct MetaCache {
    dir: PathBuf,
    config: CacheConfig,
}

impl MetaCache {
    pub fn new(dir: impl Into<PathBuf>, config: CacheConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached (tables, columns) for a filter. None on miss, expiry, an
    /// unreadable blob, or a blob written for a different filter (distinct
    /// filters can share a filename after sanitization).
    pub fn load(&self, schema_filter: Option<&str>) -> Option<(Vec<TableInfo>, Vec<ColumnInfo>)> {
        let stem = sanitize(&cache_key(schema_filter, None, None));
        let entry: MetaEntry = match blob::read_blob(&self.dir, &stem) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                debug!("cache read for {stem} failed, treating as miss: {err:#}");
                return None;
            }
        };
        if entry.schema_filter.as_deref() != schema_filter {
            debug!(
                "cache entry {stem} was written for filter {:?}, not {:?}; treating as miss",
                entry.schema_filter, schema_filter
            );
            return None;
        }
        if self.is_expired(entry.cached_at) {
            debug!("cache entry {stem} expired");
            return None;
        }
        Some((entry.tables, entry.columns))
    }

    /// Overwrite the entry for a filter, stamping the current time.
    /// Failures are logged and swallowed.
    pub fn save(&self, schema_filter: Option<&str>, tables: &[TableInfo], columns: &[ColumnInfo]) {
        if let Err(err) = self.try_save(schema_filter, tables, columns) {
            warn!("cache write failed: {err:#}");
        }
    }

    /// Fallible form of [`save`](Self::save); returns the path written.
    pub fn try_save(
        &self,
        schema_filter: Option<&str>,
        tables: &[TableInfo],
        columns: &[ColumnInfo],
    ) -> Result<PathBuf> {
        let stem = sanitize(&cache_key(schema_filter, None, None));
        let entry = MetaEntry {
            cached_at: now_epoch_secs(),
            schema_filter: schema_filter.map(str::to_string),
            tables: tables.to_vec(),
            columns: columns.to_vec(),
        };
        blob::write_blob(&self.dir, &stem, &entry, self.config.compress)
    }

    /// The schema-name list, cached independently of any data entry.
    pub fn load_schemas(&self) -> Option<Vec<SchemaInfo>> {
        let entry: SchemasEntry = match blob::read_blob(&self.dir, CacheConsts::SCHEMAS_KEY) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                debug!("schemas cache read failed, treating as miss: {err:#}");
                return None;
            }
        };
        if self.is_expired(entry.cached_at) {
            debug!("schemas cache entry expired");
            return None;
        }
        Some(entry.schemas)
    }

    pub fn save_schemas(&self, schemas: &[SchemaInfo]) {
        if let Err(err) = self.try_save_schemas(schemas) {
            warn!("schemas cache write failed: {err:#}");
        }
    }

    pub fn try_save_schemas(&self, schemas: &[SchemaInfo]) -> Result<PathBuf> {
        let entry = SchemasEntry {
            cached_at: now_epoch_secs(),
            schemas: schemas.to_vec(),
        };
        blob::write_blob(&self.dir, CacheConsts::SCHEMAS_KEY, &entry, self.config.compress)
    }

    /// Drop the entry for one filter, whichever extension it carries.
    pub fn remove(&self, schema_filter: Option<&str>) -> Result<()> {
        let stem = sanitize(&cache_key(schema_filter, None, None));
        blob::remove_blob(&self.dir, &stem)
    }

    /// Remove every cache file under the directory. Returns how many went.
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("read cache dir {}", self.dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read cache dir {}", self.dir.display()))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".json") || name.ends_with(".json.gz") || name.ends_with(".tmp") {
                let path = entry.path();
                fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn is_expired(&self, cached_at: u64) -> bool {
        now_epoch_secs().saturating_sub(cached_at) >= self.config.ttl.as_secs()
    }
}

/// Cache keys become filenames as-is except every non-alphanumeric char
/// turns into `_` (schema filters can carry dots and quoting).
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '_' })
        .collect()
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
