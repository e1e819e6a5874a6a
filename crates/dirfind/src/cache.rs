//! Persistent directory cache.
//!
//! Maps directory paths relative to the workspace root to the modification
//! time observed when the directory was last visited.
//!
//! - `store` - In-memory map with explicit freshness/dirty state
//! - `persistence` - Snapshot read/write (postcard + zstd, atomic rename)

mod persistence;
mod store;

pub use persistence::{load_snapshot, write_snapshot, CACHE_FORMAT_VERSION};
pub use store::{CacheState, PathCache};
