//! Directory lookup over a large, mostly static source tree.
//!
//! This crate provides the lookup core:
//! - Persistent cache of directory paths and their modification times
//! - Depth-limited tree walking with an mtime-based skip of the last level
//! - Exact suffix matching and deterministic fuzzy ranking
//! - A `Finder` that combines them into one lookup strategy
//!
//! The cache file is owned by a single process at a time. Concurrent lookups
//! against the same cache file are not coordinated; the last flush wins.

pub mod cache;
pub mod config;
pub mod error;
pub mod finder;
pub mod path;
pub mod rank;
pub mod walk;

// Re-export main types
pub use cache::{CacheState, PathCache};
pub use config::{default_cache_path, DepthLimit, FinderConfig, DEFAULT_MAX_RESULTS};
pub use error::{DirFindError, Result};
pub use finder::{FindOutcome, Finder, LookupStage};
pub use rank::{rank_candidates, OrderedRanks, Rank, FUZZY_DISTANCE_THRESHOLD};
pub use walk::{walk_tree, WalkMode, WalkOptions, WalkOutcome, WalkStats};
