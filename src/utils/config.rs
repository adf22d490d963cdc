//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    cache_dir_name: String,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                cache_dir_name: pkg.to_string(),
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Directory name under the platform cache root holding blob files.
    pub fn cache_dir_name(&self) -> &str {
        &self.cache_dir_name
    }

    /// Optional per-directory config file name (`.schemax.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Loader / streaming ----

/// Streaming loader tuning: chunk budgets and the adaptive page controller.
pub struct LoaderConsts;

impl LoaderConsts {
    /// Default row budget for the first chunk when the caller gives none.
    pub const DEFAULT_INITIAL_LIMIT: usize = 100;
    /// Hard cap on the first chunk regardless of the requested budget;
    /// first paint should never wait on a huge page.
    pub const FIRST_CHUNK_CAP: usize = 200;
    /// Seed for the adaptive page size on chunks after the first.
    pub const DEFAULT_BATCH_SIZE: usize = 500;
    /// Adaptive page size floor.
    pub const MIN_BATCH: usize = 50;
    /// Adaptive page size ceiling.
    pub const MAX_BATCH: usize = 5_000;
    /// Page fetch duration the controller steers toward (milliseconds).
    pub const TARGET_PAGE_MS: u64 = 500;
    /// Trailing page timings the controller averages before adjusting.
    pub const TIMING_WINDOW: usize = 3;
    /// New size as a percent of the old when pages run fast (+50%).
    pub const GROW_PERCENT: usize = 150;
    /// New size as a percent of the old when pages run slow (-30%).
    pub const SHRINK_PERCENT: usize = 70;
    /// Bounded capacity of the loader event channel; a slow consumer
    /// backpressures the worker instead of buffering without limit.
    pub const EVENT_CHANNEL_CAP: usize = 64;
}

// ---- Cache ----

/// Disk cache keys, freshness, and file naming.
pub struct CacheConsts;

impl CacheConsts {
    /// Entries older than this are treated as misses (seconds). 24 hours.
    pub const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;
    /// Key base when no schema filter is set.
    pub const ALL_SCHEMAS_KEY: &'static str = "ALL_SCHEMAS";
    /// Fixed key for the schema-list blob.
    pub const SCHEMAS_KEY: &'static str = "schemas";
}

// ---- Search ----

/// Search scan tuning.
pub struct SearchConsts;

impl SearchConsts {
    /// Entries scanned between cancellation checks during a fuzzy pass.
    pub const CANCEL_POLL_EVERY: usize = 512;
}
