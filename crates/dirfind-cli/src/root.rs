//! Workspace root resolution.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{bail, Result};

/// Candidate roots in order of preference: an explicit root (from `--root`
/// or `$DIRFIND_ROOT`), the first `$GOPATH` entry's `src`, then
/// `<home>/go/src`.
pub fn candidate_roots(
    explicit: Option<PathBuf>,
    gopath: Option<OsString>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    if let Some(root) = explicit {
        return vec![root];
    }

    let mut candidates = Vec::new();
    if let Some(gopath) = gopath.filter(|value| !value.is_empty()) {
        if let Some(first) = env::split_paths(&gopath).find(|p| !p.as_os_str().is_empty()) {
            candidates.push(first.join("src"));
        }
    }
    if let Some(home) = home {
        candidates.push(home.join("go").join("src"));
    }
    candidates
}

/// Picks the first candidate that is an existing directory.
///
/// An explicit root is returned as given (made absolute) so the caller's
/// validation reports it precisely.
pub fn resolve_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let explicit_given = explicit.is_some();
    let candidates = candidate_roots(explicit, env::var_os("GOPATH"), dirs::home_dir());

    if explicit_given {
        let root = candidates.into_iter().next().unwrap_or_default();
        return absolutize(root);
    }

    for candidate in &candidates {
        if candidate.is_dir() {
            return absolutize(candidate.clone());
        }
    }
    bail!(
        "no workspace root found (tried {}); pass --root or set DIRFIND_ROOT",
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
