//! Load `.schemax.toml` from a directory (CLI only). Lib callers skip this
//! and hand settings to the loader and cache directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::RunSettings;
use crate::utils::config::PackagePaths;

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaxToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    cache_dir: Option<String>,
    ttl_secs: Option<u64>,
    compress: Option<bool>,
    initial_limit: Option<usize>,
    batch_size: Option<usize>,
    target_page_ms: Option<u64>,
    verbose: Option<bool>,
    pretty: Option<bool>,
}

/// Load `.schemax.toml` from `dir` if present. Returns None if file missing
/// or unreadable. CLI only.
pub(crate) fn load_schemax_toml(dir: &Path) -> Option<SchemaxToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite settings field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $settings:expr, $sec_field:ident => $settings_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $settings.$settings_field = v;
        }
    };
}

/// Apply file config to settings (only fields present in the file).
/// Call before applying CLI flags; explicit flags win.
pub(crate) fn apply_file_to_settings(file: &SchemaxToml, settings: &mut RunSettings) {
    let sec = &file.settings;
    if let Some(ref p) = sec.cache_dir {
        settings.cache_dir = Some(PathBuf::from(p));
    }
    apply_file_opt!(sec, settings, ttl_secs => ttl_secs);
    apply_file_opt!(sec, settings, compress => compress);
    apply_file_opt!(sec, settings, initial_limit => initial_limit);
    apply_file_opt!(sec, settings, batch_size => batch_size);
    apply_file_opt!(sec, settings, target_page_ms => target_page_ms);
    apply_file_opt!(sec, settings, verbose => verbose);
    apply_file_opt!(sec, settings, pretty => pretty);
}
