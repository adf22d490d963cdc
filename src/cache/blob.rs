//! Blob file IO for the cache: atomic JSON writes, optional gzip.
//!
//! A stem owns up to one file on disk, `<stem>.json` or `<stem>.json.gz`;
//! the extension records how it was written, so any reader can decode any
//! writer's output by branching on the name it finds.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;

const PLAIN_EXT: &str = "json";
const GZ_EXT: &str = "json.gz";

/// Write `value` under `dir/stem.<ext>` atomically (temp file + rename),
/// then drop the sibling variant so the stem keeps exactly one
/// authoritative file. Returns the path written.
pub fn write_blob<T: Serialize>(
    dir: &Path,
    stem: &str,
    value: &T,
    compress: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create cache dir {}", dir.display()))?;
    let json = serde_json::to_vec(value).context("encode cache blob")?;
    let (path, sibling) = if compress {
        (
            dir.join(format!("{stem}.{GZ_EXT}")),
            dir.join(format!("{stem}.{PLAIN_EXT}")),
        )
    } else {
        (
            dir.join(format!("{stem}.{PLAIN_EXT}")),
            dir.join(format!("{stem}.{GZ_EXT}")),
        )
    };
    let bytes = if compress {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).context("gzip cache blob")?;
        encoder.finish().context("finish gzip stream")?
    } else {
        json
    };
    let tmp = dir.join(format!("{stem}.tmp"));
    fs::write(&tmp, &bytes).with_context(|| format!("write temp blob {}", tmp.display()))?;
    fs::rename(&tmp, &path)
        .with_context(|| format!("rename temp blob to {}", path.display()))?;
    if sibling.exists() {
        let _ = fs::remove_file(&sibling);
    }
    Ok(path)
}

/// Read the blob stored under `dir/stem`, compressed name first.
/// `Ok(None)` when neither variant exists; `Err` on unreadable or
/// undecodable content (callers downgrade that to a miss).
pub fn read_blob<T: DeserializeOwned>(dir: &Path, stem: &str) -> Result<Option<T>> {
    let gz = dir.join(format!("{stem}.{GZ_EXT}"));
    if gz.exists() {
        let file = File::open(&gz).with_context(|| format!("open {}", gz.display()))?;
        let mut decoder = GzDecoder::new(file);
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .with_context(|| format!("gunzip {}", gz.display()))?;
        let value =
            serde_json::from_slice(&json).with_context(|| format!("decode {}", gz.display()))?;
        return Ok(Some(value));
    }
    let plain = dir.join(format!("{stem}.{PLAIN_EXT}"));
    if !plain.exists() {
        return Ok(None);
    }
    let json = fs::read(&plain).with_context(|| format!("read {}", plain.display()))?;
    let value =
        serde_json::from_slice(&json).with_context(|| format!("decode {}", plain.display()))?;
    Ok(Some(value))
}

/// Remove both extension variants for a stem. Missing files are fine.
pub fn remove_blob(dir: &Path, stem: &str) -> Result<()> {
    for name in [format!("{stem}.{GZ_EXT}"), format!("{stem}.{PLAIN_EXT}")] {
        let path = dir.join(name);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
    }
    Ok(())
}
