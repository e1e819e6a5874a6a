//! In-memory directory cache with explicit persistence state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::persistence::{load_snapshot, write_snapshot};
use crate::error::Result;
use crate::path::suffix_matches;

/// Relationship between the in-memory cache and its persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No usable snapshot was loaded. A full rebuild is required before the
    /// contents can be trusted, and the next save always writes.
    Fresh,
    /// Identical to the persisted snapshot.
    Clean,
    /// Diverged from the persisted snapshot since the last load or save.
    Dirty,
}

impl CacheState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Clean => "clean",
            Self::Dirty => "dirty",
        }
    }
}

/// Relative directory path to last observed modification time.
#[derive(Debug)]
pub struct PathCache {
    path: PathBuf,
    entries: HashMap<String, i64>,
    state: CacheState,
}

impl PathCache {
    /// Creates a cache backed by `path` and loads it immediately.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut cache = Self {
            path: path.into(),
            entries: HashMap::new(),
            state: CacheState::Fresh,
        };
        cache.load();
        cache
    }

    /// Replaces the in-memory contents with the persisted snapshot.
    ///
    /// A missing or undecodable snapshot leaves the cache empty and `Fresh`.
    pub fn load(&mut self) {
        match load_snapshot(&self.path) {
            Some(entries) => {
                self.entries = entries;
                self.state = CacheState::Clean;
            }
            None => {
                self.entries.clear();
                self.state = CacheState::Fresh;
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn is_fresh(&self) -> bool {
        self.state == CacheState::Fresh
    }

    /// Returns true if the next [`save`](Self::save) will write.
    pub fn needs_flush(&self) -> bool {
        self.state != CacheState::Clean
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.entries.get(key).copied()
    }

    /// Inserts or updates `key`.
    pub fn add(&mut self, key: impl Into<String>, mtime: i64) {
        let previous = self.entries.insert(key.into(), mtime);
        if previous != Some(mtime) {
            self.touch();
        }
    }

    /// Removes `key`; no-op if absent.
    pub fn del(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.touch();
        }
    }

    /// Declares a full rebuild complete. The contents are now trustworthy
    /// but still differ from whatever is on disk.
    pub fn mark_rebuilt(&mut self) {
        if self.state == CacheState::Fresh {
            self.state = CacheState::Dirty;
        }
    }

    /// Looks `query` up as a whole key first, then as a component suffix of
    /// every key.
    ///
    /// A whole-key hit returns that key alone with `true`. Otherwise up to
    /// `max_results` suffix matches are returned in lexicographic order with
    /// `false`.
    pub fn contains_by_suffix(&self, query: &str, max_results: usize) -> (Vec<String>, bool) {
        if self.entries.contains_key(query) {
            return (vec![query.to_string()], true);
        }
        let mut matches: Vec<String> = self
            .entries
            .keys()
            .filter(|key| suffix_matches(query, key))
            .cloned()
            .collect();
        matches.sort_unstable();
        matches.truncate(max_results);
        (matches, false)
    }

    /// All keys in lexicographic order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Persists the cache if it is `Fresh` or `Dirty`.
    ///
    /// Returns whether a snapshot was written.
    pub fn save(&mut self) -> Result<bool> {
        if !self.needs_flush() {
            return Ok(false);
        }
        write_snapshot(&self.path, &self.entries)?;
        self.state = CacheState::Clean;
        Ok(true)
    }

    fn touch(&mut self) {
        if self.state == CacheState::Clean {
            self.state = CacheState::Dirty;
        }
    }
}
