//! Relative path keys and suffix matching.
//!
//! Cache keys are directory paths relative to the workspace root with their
//! components joined by `/`, independent of the platform separator.

/// Separator used between components of a cache key.
pub const KEY_SEPARATOR: char = '/';

/// Directory segment that is never indexed.
pub const VENDOR_SEGMENT: &str = "vendor";

/// Normalizes a query into key form: `\` becomes `/`, empty and `.`
/// components are dropped.
pub fn normalize_query(query: &str) -> String {
    query
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Number of components in a key.
pub fn key_depth(key: &str) -> usize {
    if key.is_empty() {
        0
    } else {
        key.split(KEY_SEPARATOR).count()
    }
}

/// Returns true if `query` equals a contiguous trailing slice of the
/// components of `key`.
///
/// Both arguments are expected in key form (see [`normalize_query`]).
pub fn suffix_matches(query: &str, key: &str) -> bool {
    if query.is_empty() {
        return false;
    }
    if key == query {
        return true;
    }
    key.len() > query.len()
        && key.ends_with(query)
        && key.as_bytes()[key.len() - query.len() - 1] == KEY_SEPARATOR as u8
}

/// Directories whose name starts with `.` or `_` are hidden from the index.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

/// Returns true if any component of `key` is the vendor segment.
pub fn has_vendor_segment(key: &str) -> bool {
    key.split(KEY_SEPARATOR).any(|part| part == VENDOR_SEGMENT)
}
