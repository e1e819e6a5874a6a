//! Cache persistence - snapshot read/write operations.
//!
//! Snapshots are postcard-encoded and zstd-compressed. Writes go to a
//! temporary file in the target directory which is then renamed over the
//! previous snapshot, so a reader never observes a partially written file.
//! There is no locking: concurrent writers race and the last rename wins.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{DirFindError, Result};

/// Cache format version - increment when changing the format.
/// A snapshot with any other version is discarded and rebuilt.
pub const CACHE_FORMAT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 6;

/// On-disk representation of the cache.
#[derive(Serialize, Deserialize)]
struct PersistentStorage<'a> {
    /// Cache format version.
    version: u32,
    /// Unix timestamp (seconds) when the snapshot was written.
    saved_at: u64,
    /// Relative directory path to modification time (ns since epoch).
    entries: Cow<'a, HashMap<String, i64>>,
}

/// Writes the cache entries to `cache_path`.
pub fn write_snapshot(cache_path: &Path, entries: &HashMap<String, i64>) -> Result<()> {
    let storage = PersistentStorage {
        version: CACHE_FORMAT_VERSION,
        saved_at: unix_now_secs(),
        entries: Cow::Borrowed(entries),
    };

    let parent = match cache_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|error| {
        DirFindError::Internal(format!(
            "failed to create cache directory {}: {error}",
            parent.display()
        ))
    })?;

    let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|error| {
        DirFindError::Internal(format!(
            "failed to create temporary cache file in {}: {error}",
            parent.display()
        ))
    })?;

    {
        let encoder = zstd::Encoder::new(tmp.as_file(), ZSTD_LEVEL).map_err(|error| {
            DirFindError::Internal(format!("failed to create zstd encoder: {error}"))
        })?;
        let mut output = BufWriter::new(encoder);

        postcard::to_io(&storage, &mut output).map_err(|error| {
            DirFindError::Serialization(format!("failed to encode cache with postcard: {error}"))
        })?;
        let encoder = output.into_inner().map_err(|error| error.into_error())?;
        encoder.finish()?;
    }

    tmp.persist(cache_path).map_err(|error| {
        DirFindError::Internal(format!(
            "failed to finalize cache file {}: {}",
            cache_path.display(),
            error.error
        ))
    })?;

    log::debug!(
        "wrote directory cache to {} ({} entries)",
        cache_path.display(),
        entries.len()
    );

    Ok(())
}

/// Loads cache entries from `cache_path`.
///
/// Returns `None` when the file is missing or cannot be decoded; callers
/// treat both as "rebuild from scratch".
pub fn load_snapshot(cache_path: &Path) -> Option<HashMap<String, i64>> {
    let input = match File::open(cache_path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            log::debug!("no directory cache at {}", cache_path.display());
            return None;
        }
        Err(error) => {
            log::warn!(
                "directory cache read failed for {}: {}",
                cache_path.display(),
                error
            );
            return None;
        }
    };

    let mut decoder = match zstd::Decoder::new(input) {
        Ok(d) => d,
        Err(error) => {
            log::warn!(
                "directory cache decompress failed for {}: {}",
                cache_path.display(),
                error
            );
            return None;
        }
    };

    let mut bytes = Vec::new();
    if let Err(error) = decoder.read_to_end(&mut bytes) {
        log::warn!(
            "directory cache decompress failed for {}: {}",
            cache_path.display(),
            error
        );
        return None;
    }

    let storage: PersistentStorage<'static> = match postcard::from_bytes(&bytes) {
        Ok(s) => s,
        Err(error) => {
            log::warn!(
                "directory cache decode failed for {}: {}",
                cache_path.display(),
                error
            );
            return None;
        }
    };

    if storage.version != CACHE_FORMAT_VERSION {
        log::debug!(
            "cache version mismatch: {} != {}",
            storage.version,
            CACHE_FORMAT_VERSION
        );
        return None;
    }

    let entries = storage.entries.into_owned();
    log::debug!(
        "loaded directory cache from {} ({} entries, saved_at={})",
        cache_path.display(),
        entries.len(),
        storage.saved_at
    );

    Some(entries)
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
