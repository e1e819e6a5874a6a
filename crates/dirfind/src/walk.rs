//! Directory walking that refreshes the cache.
//!
//! The walk is depth first with children visited in name order, so the first
//! match reported for a query is deterministic. Only directories are indexed;
//! symlinks are never followed.
//!
//! ## mtime skip
//!
//! A directory's mtime changes only when a direct child is added or removed.
//! For a directory exactly one level above the depth limit, an unchanged
//! mtime therefore proves that its children (the deepest indexed level) are
//! unchanged too, and the walk does not enumerate them. At shallower depths
//! new descendants can appear without touching the directory's own mtime, so
//! those are always descended.
//!
//! A directory at that level only gets its current mtime recorded once all
//! of its children have been visited. If the walk stops early, the previous
//! value is kept (or [`UNSCANNED_MTIME`] for a directory seen for the first
//! time) so the next walk enumerates it again.

use std::fs::{self, DirEntry, Metadata};
use std::ops::ControlFlow;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::cache::PathCache;
use crate::config::DepthLimit;
use crate::path::{has_vendor_segment, is_hidden_name, key_depth, suffix_matches};

/// Recorded for a directory whose children have not been fully visited yet.
/// Never equal to a real mtime, so the skip does not apply to it.
pub const UNSCANNED_MTIME: i64 = i64::MIN;

/// How the walk treats the existing cache contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Visit and record every directory within the depth limit. Used to
    /// rebuild a cache that could not be loaded.
    Full,
    /// Use the mtime skip and stop at the first directory matching the
    /// query.
    Incremental,
}

/// Parameters of a single walk.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions<'a> {
    pub root: &'a Path,
    pub depth_limit: DepthLimit,
    pub mode: WalkMode,
    /// Query in key form. Ignored in [`WalkMode::Full`].
    pub query: Option<&'a str>,
}

impl<'a> WalkOptions<'a> {
    /// Options for a full rebuild of `root`.
    pub fn full(root: &'a Path, depth_limit: DepthLimit) -> Self {
        Self {
            root,
            depth_limit,
            mode: WalkMode::Full,
            query: None,
        }
    }

    /// Options for an incremental walk searching for `query`.
    pub fn incremental(root: &'a Path, depth_limit: DepthLimit, query: &'a str) -> Self {
        Self {
            root,
            depth_limit,
            mode: WalkMode::Incremental,
            query: Some(query),
        }
    }
}

/// Counters collected during a walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories recorded in the cache.
    pub visited_dirs: usize,
    /// Directories whose children were skipped thanks to an unchanged mtime.
    pub skipped_dirs: usize,
    /// Hidden, underscore and vendor directories left out.
    pub excluded_dirs: usize,
    /// Entries that could not be read.
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    /// First directory (as a key) matching the query, in traversal order.
    pub found: Option<String>,
    pub stats: WalkStats,
}

/// Traversal state threaded through the recursion.
#[derive(Debug, Default)]
struct WalkState {
    stats: WalkStats,
    found: Option<String>,
}

/// Walks `options.root`, recording every indexed directory in `cache`.
pub fn walk_tree(options: &WalkOptions<'_>, cache: &mut PathCache) -> WalkOutcome {
    let mut state = WalkState::default();
    if !options.depth_limit.reached(0) {
        let _ = walk_children(options.root, "", options, cache, &mut state);
    }

    log::debug!(
        "walked {} ({:?}): visited={} skipped={} excluded={} errors={} found={:?}",
        options.root.display(),
        options.mode,
        state.stats.visited_dirs,
        state.stats.skipped_dirs,
        state.stats.excluded_dirs,
        state.stats.errors,
        state.found
    );

    WalkOutcome {
        found: state.found,
        stats: state.stats,
    }
}

/// Enumerates the children of `dir` (whose key is `dir_key`) in name order.
fn walk_children(
    dir: &Path,
    dir_key: &str,
    options: &WalkOptions<'_>,
    cache: &mut PathCache,
    state: &mut WalkState,
) -> ControlFlow<()> {
    let read_dir = match fs::read_dir(dir) {
        Ok(iter) => iter,
        Err(error) => {
            log::warn!("cannot read directory {}: {}", dir.display(), error);
            state.stats.errors += 1;
            return ControlFlow::Continue(());
        }
    };

    let mut entries: Vec<DirEntry> = Vec::new();
    for entry in read_dir {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(error) => {
                log::warn!("cannot read entry in {}: {}", dir.display(), error);
                state.stats.errors += 1;
            }
        }
    }
    entries.sort_unstable_by_key(DirEntry::file_name);

    let depth = key_depth(dir_key) + 1;

    for entry in entries {
        // file_type does not follow symlinks
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(error) => {
                log::warn!("cannot stat {}: {}", entry.path().display(), error);
                state.stats.errors += 1;
                continue;
            }
        };
        if !file_type.is_dir() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                log::warn!(
                    "skipping non UTF-8 directory name {name:?} in {}",
                    dir.display()
                );
                state.stats.errors += 1;
                continue;
            }
        };
        let key = if dir_key.is_empty() {
            name.to_string()
        } else {
            format!("{dir_key}/{name}")
        };

        if is_hidden_name(&name) || has_vendor_segment(&key) {
            state.stats.excluded_dirs += 1;
            continue;
        }

        visit_dir(&entry.path(), key, depth, options, cache, state)?;
    }

    ControlFlow::Continue(())
}

/// Records a single directory, checks it against the query and decides
/// whether to descend.
fn visit_dir(
    path: &Path,
    key: String,
    depth: usize,
    options: &WalkOptions<'_>,
    cache: &mut PathCache,
    state: &mut WalkState,
) -> ControlFlow<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) => {
            log::warn!("cannot stat {}: {}", path.display(), error);
            state.stats.errors += 1;
            return ControlFlow::Continue(());
        }
    };
    let mtime = modified_nanos(&metadata);
    let previous = cache.get(&key);
    let incremental = options.mode == WalkMode::Incremental;
    let last_level = incremental && options.depth_limit.is_last_level(depth);
    if last_level {
        cache.add(key.as_str(), previous.unwrap_or(UNSCANNED_MTIME));
    } else {
        cache.add(key.as_str(), mtime);
    }
    state.stats.visited_dirs += 1;

    if incremental {
        if let Some(query) = options.query {
            if suffix_matches(query, &key) {
                state.found = Some(key);
                return ControlFlow::Break(());
            }
        }
    }

    if options.depth_limit.reached(depth) {
        return ControlFlow::Continue(());
    }

    if last_level && previous == Some(mtime) {
        state.stats.skipped_dirs += 1;
        return ControlFlow::Continue(());
    }

    let flow = walk_children(path, &key, options, cache, state);
    if last_level && flow.is_continue() {
        cache.add(key, mtime);
    }
    flow
}

/// Modification time in nanoseconds since the Unix epoch, or 0 if the
/// platform cannot report it.
pub fn modified_nanos(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|value| value.duration_since(UNIX_EPOCH).ok())
        .and_then(|value| i64::try_from(value.as_nanos()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use tempfile::TempDir;

    struct Fixture {
        tree: TempDir,
        cache_dir: TempDir,
    }

    impl Fixture {
        fn new(dirs: &[&str]) -> Self {
            let tree = TempDir::new().unwrap();
            for dir in dirs {
                fs::create_dir_all(tree.path().join(dir)).unwrap();
            }
            Self {
                tree,
                cache_dir: TempDir::new().unwrap(),
            }
        }

        fn root(&self) -> &Path {
            self.tree.path()
        }

        fn cache(&self) -> PathCache {
            PathCache::open(self.cache_dir.path().join("cache.bin.zst"))
        }
    }

    fn set_mtime(path: &Path, secs: i64) {
        filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
    }

    #[test]
    fn full_walk_indexes_directories_only() {
        let fx = Fixture::new(&["alpha/pkgA", "beta/pkgB"]);
        File::create(fx.root().join("alpha/file.txt")).unwrap();

        let mut cache = fx.cache();
        let outcome = walk_tree(&WalkOptions::full(fx.root(), DepthLimit::Unlimited), &mut cache);

        assert_eq!(outcome.found, None);
        assert_eq!(outcome.stats.visited_dirs, 4);
        assert_eq!(
            cache.keys(),
            vec!["alpha", "alpha/pkgA", "beta", "beta/pkgB"]
        );
    }

    #[test]
    fn excluded_directories_are_not_descended() {
        let fx = Fixture::new(&[".git/objects", "_build/out", "proj/vendor/lib", "proj/src"]);

        let mut cache = fx.cache();
        let outcome = walk_tree(&WalkOptions::full(fx.root(), DepthLimit::Unlimited), &mut cache);

        assert_eq!(cache.keys(), vec!["proj", "proj/src"]);
        assert_eq!(outcome.stats.excluded_dirs, 3);
    }

    #[test]
    fn depth_limit_stops_descent_but_indexes_the_limit_level() {
        let fx = Fixture::new(&["a/b/c/d"]);

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), DepthLimit::Limited(2)), &mut cache);
        assert_eq!(cache.keys(), vec!["a", "a/b"]);

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), DepthLimit::Limited(0)), &mut cache);
        assert!(cache.is_empty());
    }

    #[test]
    fn incremental_walk_stops_at_first_match_in_name_order() {
        let fx = Fixture::new(&["b/pkg", "a/pkg", "c"]);

        let mut cache = fx.cache();
        let outcome = walk_tree(
            &WalkOptions::incremental(fx.root(), DepthLimit::Unlimited, "pkg"),
            &mut cache,
        );

        assert_eq!(outcome.found.as_deref(), Some("a/pkg"));
        assert_eq!(cache.keys(), vec!["a", "a/pkg"]);
    }

    #[test]
    fn incremental_walk_matches_multi_component_suffix() {
        let fx = Fixture::new(&["x/lib/util", "y/lib/util"]);

        let mut cache = fx.cache();
        let outcome = walk_tree(
            &WalkOptions::incremental(fx.root(), DepthLimit::Unlimited, "y/lib/util"),
            &mut cache,
        );
        assert_eq!(outcome.found.as_deref(), Some("y/lib/util"));
    }

    #[test]
    fn full_walk_ignores_query() {
        let fx = Fixture::new(&["a/pkg", "b"]);
        let mut cache = fx.cache();
        let options = WalkOptions {
            query: Some("pkg"),
            ..WalkOptions::full(fx.root(), DepthLimit::Unlimited)
        };
        let outcome = walk_tree(&options, &mut cache);
        assert_eq!(outcome.found, None);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn unchanged_directory_above_limit_is_skipped() {
        let fx = Fixture::new(&["a/b"]);
        let limit = DepthLimit::Limited(2);

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), limit), &mut cache);

        // A grandchild appears; `a` keeps its mtime.
        fs::create_dir(fx.root().join("a/b/c")).unwrap();
        cache.add("a/b", 42);

        let outcome = walk_tree(&WalkOptions::incremental(fx.root(), limit, "zzz"), &mut cache);
        assert_eq!(outcome.stats.skipped_dirs, 1);
        assert_eq!(cache.get("a/b"), Some(42));
    }

    #[test]
    fn shallower_directories_are_always_descended() {
        let fx = Fixture::new(&["a/b/c"]);
        let limit = DepthLimit::Limited(3);

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), limit), &mut cache);
        cache.del("a/b");
        cache.add("a/b/c", 42);

        let outcome = walk_tree(&WalkOptions::incremental(fx.root(), limit, "zzz"), &mut cache);

        // `a` (depth 1) is descended despite its unchanged mtime; `a/b`
        // (depth 2) was not cached, so it is descended as well.
        assert_eq!(outcome.stats.skipped_dirs, 0);
        assert!(cache.get("a/b").is_some());
        assert_ne!(cache.get("a/b/c"), Some(42));
    }

    #[test]
    fn changed_mtime_above_limit_is_descended() {
        let fx = Fixture::new(&["a/b"]);
        let limit = DepthLimit::Limited(2);
        set_mtime(&fx.root().join("a"), 1_000);

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), limit), &mut cache);

        fs::create_dir(fx.root().join("a/new")).unwrap();
        set_mtime(&fx.root().join("a"), 2_000);

        let outcome = walk_tree(&WalkOptions::incremental(fx.root(), limit, "new"), &mut cache);
        assert_eq!(outcome.found.as_deref(), Some("a/new"));
        // stopped inside `a`, so its old mtime is kept
        assert_eq!(cache.get("a"), Some(1_000 * 1_000_000_000));

        let outcome = walk_tree(&WalkOptions::incremental(fx.root(), limit, "zzz"), &mut cache);
        assert_eq!(outcome.stats.skipped_dirs, 0);
        assert_eq!(cache.get("a"), Some(2_000 * 1_000_000_000));
    }

    #[test]
    fn early_match_keeps_remaining_siblings_reachable() {
        let fx = Fixture::new(&["host/user/repo"]);
        let limit = DepthLimit::Limited(3);

        let user = fx.root().join("host/user");
        set_mtime(&user, 1_000);

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), limit), &mut cache);

        fs::create_dir(user.join("aaa")).unwrap();
        fs::create_dir(user.join("zzz-tool")).unwrap();
        set_mtime(&user, 2_000);

        let outcome = walk_tree(&WalkOptions::incremental(fx.root(), limit, "aaa"), &mut cache);
        assert_eq!(outcome.found.as_deref(), Some("host/user/aaa"));
        assert_eq!(cache.get("host/user/zzz-tool"), None);
        assert_eq!(cache.get("host/user"), Some(1_000 * 1_000_000_000));

        let outcome = walk_tree(
            &WalkOptions::incremental(fx.root(), limit, "zzz-tool"),
            &mut cache,
        );
        assert_eq!(outcome.stats.skipped_dirs, 0);
        assert_eq!(outcome.found.as_deref(), Some("host/user/zzz-tool"));
    }

    #[test]
    fn first_sighting_interrupted_is_not_skipped_later() {
        let fx = Fixture::new(&["a/b/m", "a/b/z"]);
        let limit = DepthLimit::Limited(3);

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), DepthLimit::Limited(1)), &mut cache);

        let outcome = walk_tree(&WalkOptions::incremental(fx.root(), limit, "m"), &mut cache);
        assert_eq!(outcome.found.as_deref(), Some("a/b/m"));
        assert_eq!(cache.get("a/b"), Some(UNSCANNED_MTIME));

        let outcome = walk_tree(&WalkOptions::incremental(fx.root(), limit, "z"), &mut cache);
        assert_eq!(outcome.found.as_deref(), Some("a/b/z"));
    }

    #[test]
    fn full_walk_never_skips() {
        let fx = Fixture::new(&["a/b"]);
        let limit = DepthLimit::Limited(2);

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), limit), &mut cache);
        cache.add("a/b", 42);

        let outcome = walk_tree(&WalkOptions::full(fx.root(), limit), &mut cache);
        assert_eq!(outcome.stats.skipped_dirs, 0);
        assert_ne!(cache.get("a/b"), Some(42));
    }

    #[test]
    fn unreadable_root_is_counted_not_fatal() {
        let fx = Fixture::new(&[]);
        let missing = fx.root().join("missing");

        let mut cache = fx.cache();
        let outcome = walk_tree(&WalkOptions::full(&missing, DepthLimit::Unlimited), &mut cache);
        assert_eq!(outcome.stats.errors, 1);
        assert!(cache.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_does_not_stop_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new(&["a", "locked/inner", "z/deep"]);
        let locked = fx.root().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // privileged users can still list it
        let readable = fs::read_dir(&locked).is_ok();

        let mut cache = fx.cache();
        let outcome = walk_tree(&WalkOptions::full(fx.root(), DepthLimit::Unlimited), &mut cache);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        for key in ["a", "locked", "z", "z/deep"] {
            assert!(cache.get(key).is_some(), "{key} should be indexed");
        }
        if !readable {
            assert_eq!(outcome.stats.errors, 1);
            assert_eq!(cache.get("locked/inner"), None);
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fx = Fixture::new(&["alpha/good"]);
        let bad = OsStr::from_bytes(b"bad\xffname");
        fs::create_dir(fx.root().join("alpha").join(bad)).unwrap();

        let mut cache = fx.cache();
        let outcome = walk_tree(&WalkOptions::full(fx.root(), DepthLimit::Unlimited), &mut cache);

        assert_eq!(cache.keys(), vec!["alpha", "alpha/good"]);
        assert_eq!(outcome.stats.errors, 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let fx = Fixture::new(&["real/inner"]);
        std::os::unix::fs::symlink(fx.root().join("real"), fx.root().join("link")).unwrap();

        let mut cache = fx.cache();
        walk_tree(&WalkOptions::full(fx.root(), DepthLimit::Unlimited), &mut cache);
        assert_eq!(cache.keys(), vec!["real", "real/inner"]);
    }
}
