//! Lookup orchestration.
//!
//! [`Finder::find`] tries, in order:
//! 1. the query as a literal path (absolute, or existing under the root)
//! 2. a full rebuild if the cache could not be loaded
//! 3. a whole-key hit in the cache, verified on disk
//! 4. an incremental walk that stops at the first suffix match
//! 5. fuzzy ranking of every cached directory
//!
//! and flushes the cache once before returning from stages 2-5.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::PathCache;
use crate::config::FinderConfig;
use crate::error::DirFindError;
use crate::path::normalize_query;
use crate::rank::{rank_candidates, OrderedRanks, Rank};
use crate::walk::{walk_tree, WalkOptions};

/// Which stage produced the result of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    Literal,
    Cache,
    Walk,
    Fuzzy,
}

impl LookupStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Cache => "cache",
            Self::Walk => "walk",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// Result of [`Finder::find`].
#[derive(Debug)]
pub struct FindOutcome {
    /// Ranked matches; empty when nothing matched.
    pub ranks: OrderedRanks,
    pub stage: LookupStage,
    /// Whether the cache snapshot was rewritten.
    pub persisted: bool,
    /// Failure of the final cache flush. Does not affect `ranks`.
    pub persist_error: Option<DirFindError>,
}

/// Finds directories below a workspace root.
#[derive(Debug)]
pub struct Finder {
    config: FinderConfig,
    cache: PathCache,
}

impl Finder {
    /// Creates a finder and loads its cache.
    pub fn new(config: FinderConfig) -> Self {
        let cache = PathCache::open(config.cache_path.clone());
        Self { config, cache }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// Absolute path of a ranked target.
    pub fn resolve(&self, rank: &Rank) -> PathBuf {
        self.config.root.join(&rank.target)
    }

    /// Looks `query` up, returning at most `max_results` ranks.
    pub fn find(&mut self, query: &str, max_results: usize) -> FindOutcome {
        if let Some(rank) = self.literal_path(query) {
            log::debug!("{query:?} is a literal path");
            return FindOutcome {
                ranks: OrderedRanks::single(rank),
                stage: LookupStage::Literal,
                persisted: false,
                persist_error: None,
            };
        }

        let query = normalize_query(query);
        let (ranks, stage) = self.lookup(&query, max_results);

        let (persisted, persist_error) = match self.cache.save() {
            Ok(persisted) => (persisted, None),
            Err(error) => {
                log::warn!(
                    "failed to save directory cache {}: {}",
                    self.cache.path().display(),
                    error
                );
                (false, Some(error))
            }
        };

        log::debug!(
            "lookup {query:?} resolved by {} stage with {} result(s)",
            stage.as_str(),
            ranks.len()
        );

        FindOutcome {
            ranks,
            stage,
            persisted,
            persist_error,
        }
    }

    fn literal_path(&self, query: &str) -> Option<Rank> {
        let path = Path::new(query);
        if path.is_absolute() || fs::metadata(self.config.root.join(path)).is_ok() {
            return Some(Rank::exact(query));
        }
        None
    }

    fn lookup(&mut self, query: &str, max_results: usize) -> (OrderedRanks, LookupStage) {
        if self.cache.is_fresh() {
            log::debug!(
                "directory cache {} unusable, rebuilding",
                self.cache.path().display()
            );
            walk_tree(
                &WalkOptions::full(&self.config.root, self.config.depth_limit),
                &mut self.cache,
            );
            self.cache.mark_rebuilt();
        }

        if let Some(rank) = self.find_in_cache(query, max_results) {
            return (OrderedRanks::single(rank), LookupStage::Cache);
        }

        let outcome = walk_tree(
            &WalkOptions::incremental(&self.config.root, self.config.depth_limit, query),
            &mut self.cache,
        );
        if let Some(found) = outcome.found {
            return (OrderedRanks::single(Rank::exact(found)), LookupStage::Walk);
        }

        let ranks = rank_candidates(query, self.cache.keys(), max_results);
        (ranks, LookupStage::Fuzzy)
    }

    /// Returns a verified whole-key hit. Every candidate that no longer
    /// exists on disk is evicted, whether or not it was a whole-key hit.
    fn find_in_cache(&mut self, query: &str, max_results: usize) -> Option<Rank> {
        let (candidates, full_match) = self.cache.contains_by_suffix(query, max_results);

        let mut verified = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self.config.root.join(&candidate).is_dir() {
                verified.push(candidate);
            } else {
                log::debug!("evicting stale cache entry {candidate:?}");
                self.cache.del(&candidate);
            }
        }

        if full_match {
            verified.into_iter().next().map(Rank::exact)
        } else {
            None
        }
    }
}
