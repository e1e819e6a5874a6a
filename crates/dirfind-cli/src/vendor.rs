//! Jump from inside a vendored dependency back to the project that vendors it.

use std::path::{Component, Path, PathBuf};

use dirfind::path::VENDOR_SEGMENT;

/// Query token that selects the vendor parent of the working directory.
pub const VENDOR_TOKEN: &str = "^";

/// Returns the directory containing the innermost `vendor` segment of `cwd`.
///
/// `None` if `cwd` has no such segment or the segment sits at the filesystem
/// root.
pub fn vendor_parent(cwd: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = cwd.components().collect();
    let position = components
        .iter()
        .rposition(|component| matches!(component, Component::Normal(name) if *name == VENDOR_SEGMENT))?;

    let parent: PathBuf = components[..position].iter().collect();
    if parent.as_os_str().is_empty() || parent.parent().is_none() {
        return None;
    }
    Some(parent)
}
