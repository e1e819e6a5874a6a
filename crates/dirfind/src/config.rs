//! Finder configuration.
//!
//! Everything the finder needs from the outside world is carried by
//! [`FinderConfig`]: the workspace root, where the cache lives, how deep to
//! walk and how many ranked results to keep.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DirFindError, Result};

/// Default walk depth, counted in path components below the root.
pub const DEFAULT_DEPTH_LIMIT: usize = 3;

/// Default number of ranked results returned by a lookup.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Directory name used under the user cache directory.
pub const CACHE_DIR_NAME: &str = "dirfind";

/// Maximum walk depth.
///
/// Serialized as a signed integer where `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum DepthLimit {
    Unlimited,
    Limited(usize),
}

impl DepthLimit {
    /// Returns true if a directory at `depth` must not be descended into.
    pub fn reached(self, depth: usize) -> bool {
        match self {
            Self::Unlimited => false,
            Self::Limited(limit) => depth >= limit,
        }
    }

    /// Returns true if `depth` sits exactly one level above the limit.
    ///
    /// Only directories at this depth may be skipped based on their mtime.
    pub fn is_last_level(self, depth: usize) -> bool {
        match self {
            Self::Unlimited => false,
            Self::Limited(limit) => limit > 0 && depth == limit - 1,
        }
    }
}

impl Default for DepthLimit {
    fn default() -> Self {
        Self::Limited(DEFAULT_DEPTH_LIMIT)
    }
}

impl TryFrom<i64> for DepthLimit {
    type Error = DirFindError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Self::Unlimited),
            v if v >= 0 => usize::try_from(v)
                .map(Self::Limited)
                .map_err(|_| DirFindError::InvalidInput(format!("depth {v} is too large"))),
            v => Err(DirFindError::InvalidInput(format!(
                "depth must be -1 (unlimited) or a non-negative integer, got {v}"
            ))),
        }
    }
}

impl From<DepthLimit> for i64 {
    fn from(limit: DepthLimit) -> Self {
        match limit {
            DepthLimit::Unlimited => -1,
            DepthLimit::Limited(limit) => i64::try_from(limit).unwrap_or(i64::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Absolute directory under which all candidates are searched.
    pub root: PathBuf,
    /// Location of the persisted path cache.
    pub cache_path: PathBuf,
    #[serde(default)]
    pub depth_limit: DepthLimit,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl FinderConfig {
    /// Creates a configuration for `root` with default depth, result count
    /// and cache location.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let cache_path = default_cache_path(&root);
        Self {
            root,
            cache_path,
            depth_limit: DepthLimit::default(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_cache_path(mut self, cache_path: impl Into<PathBuf>) -> Self {
        self.cache_path = cache_path.into();
        self
    }

    pub fn with_depth_limit(mut self, depth_limit: DepthLimit) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Checks that the root is an absolute, existing directory.
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_absolute() {
            return Err(DirFindError::InvalidInput(format!(
                "workspace root must be absolute: {}",
                self.root.display()
            )));
        }
        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(DirFindError::InvalidInput(format!(
                "workspace root is not a directory: {}",
                self.root.display()
            ))),
            Err(_) => Err(DirFindError::PathNotFound(self.root.clone())),
        }
    }
}

/// Returns the default cache file for `root`.
///
/// Each root gets its own file so switching roots never mixes relative keys
/// from different trees.
pub fn default_cache_path(root: &Path) -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
    base.join(CACHE_DIR_NAME)
        .join(format!("index-{}.bin.zst", root_fingerprint(root)))
}

/// Computes a fingerprint for the workspace root.
fn root_fingerprint(root: &Path) -> String {
    let mut hash = 0xcbf29ce484222325u64;
    fnv1a_update(&mut hash, root.to_string_lossy().as_bytes());
    format!("{hash:016x}")
}

fn fnv1a_update(hash: &mut u64, bytes: &[u8]) {
    const FNV_PRIME: u64 = 0x100000001b3;
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}
