//! Turning ranked matches into what the shell wrapper consumes.

use std::path::PathBuf;

use anyhow::{bail, Result};

/// What to print for a lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum Selection {
    /// Nothing matched.
    None,
    /// Exactly one directory to jump to.
    One(PathBuf),
    /// Several candidates; the user picks one with a follow-up index.
    Many(Vec<PathBuf>),
}

/// Applies the optional index argument to the resolved candidates.
pub fn select(mut paths: Vec<PathBuf>, index: Option<usize>) -> Result<Selection> {
    match (paths.len(), index) {
        (0, _) => Ok(Selection::None),
        (1, _) => Ok(Selection::One(paths.remove(0))),
        (len, Some(i)) => {
            if i >= len {
                bail!("{i} is an invalid index (max {})", len - 1);
            }
            Ok(Selection::One(paths.swap_remove(i)))
        }
        (_, None) => Ok(Selection::Many(paths)),
    }
}

/// Numbered candidate list, one per line.
pub fn render_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| format!("{i}  {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
