//! Path helpers for references between Tiled documents.
//!
//! Tiled stores external tileset and image paths relative to the file that
//! mentions them. These helpers turn them into normalized paths without touching
//! the filesystem.

use std::path::{Path, PathBuf};

use normalize_path::NormalizePath;

/// Resolve `relative` against the directory containing `base_file`.
///
/// `..` and `.` components are folded away and Windows separators are accepted.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use bevy_tiledimport_assets::paths::resolve_relative_path;
///
/// let resolved = resolve_relative_path(Path::new("maps/level1.tmj"), "../tilesets\\forest.tsj");
/// assert_eq!(resolved, Path::new("tilesets/forest.tsj"));
/// ```
pub fn resolve_relative_path(base_file: &Path, relative: &str) -> PathBuf {
    let relative = relative.replace('\\', "/");
    let base_dir = base_file.parent().unwrap_or_else(|| Path::new(""));
    base_dir.join(relative).normalize()
}

/// Render a path with forward slashes, as stored in persisted state.
pub fn to_slash_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `true` if `path` lies inside `root` once both are normalized.
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.normalize().starts_with(root.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_sibling() {
        assert_eq!(
            resolve_relative_path(Path::new("maps/level1.tmj"), "forest.tsj"),
            PathBuf::from("maps/forest.tsj")
        );
    }

    #[test]
    fn test_resolve_parent_and_current_dir() {
        assert_eq!(
            resolve_relative_path(Path::new("a/b/map.tmj"), "./../../images/sheet.png"),
            PathBuf::from("images/sheet.png")
        );
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("project/maps/../maps/a.tmj"), Path::new("project")));
        assert!(!is_within(Path::new("project/../other/a.tmj"), Path::new("project")));
    }
}
