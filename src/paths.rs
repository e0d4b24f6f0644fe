//! Path resolution against a project root.
//!
//! Configuration entries (watch directories, include paths, the sass working
//! directory) may be written relative to the project root. These helpers turn
//! them into absolute paths; entries that are already absolute pass through
//! unchanged.

use std::path::{Path, PathBuf};

/// Resolve a single entry against a project root.
///
/// Absolute entries are returned as-is. Relative entries are joined to the
/// root. This is total: there is no failure mode, odd inputs (such as an
/// empty entry) just fall out of `Path::join`.
pub fn resolve(root: &Path, entry: &Path) -> PathBuf {
    if entry.is_absolute() {
        entry.to_path_buf()
    } else {
        root.join(entry)
    }
}

/// Resolve a sequence of entries against a project root, preserving order.
pub fn resolve_all(root: &Path, entries: &[PathBuf]) -> Vec<PathBuf> {
    entries.iter().map(|entry| resolve(root, entry)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_entry_joins_root() {
        let resolved = resolve(Path::new("/proj"), Path::new("styles"));
        assert_eq!(resolved, PathBuf::from("/proj/styles"));
    }

    #[test]
    fn test_absolute_entry_passes_through() {
        let resolved = resolve(Path::new("/proj"), Path::new("/abs/styles"));
        assert_eq!(resolved, PathBuf::from("/abs/styles"));
    }

    #[test]
    fn test_nested_relative_entry() {
        let resolved = resolve(Path::new("/proj"), Path::new("web/assets/scss"));
        assert_eq!(resolved, PathBuf::from("/proj/web/assets/scss"));
    }

    #[test]
    fn test_empty_entry_is_harmless() {
        // Joining an empty path is a no-op pass-through to the root.
        let resolved = resolve(Path::new("/proj"), Path::new(""));
        assert_eq!(resolved, PathBuf::from("/proj/"));
    }

    #[test]
    fn test_resolve_all_preserves_order() {
        let entries = vec![
            PathBuf::from("styles"),
            PathBuf::from("/abs/lib"),
            PathBuf::from("vendor/scss"),
        ];

        let resolved = resolve_all(Path::new("/proj"), &entries);

        assert_eq!(
            resolved,
            vec![
                PathBuf::from("/proj/styles"),
                PathBuf::from("/abs/lib"),
                PathBuf::from("/proj/vendor/scss"),
            ]
        );
    }

    #[test]
    fn test_resolve_all_empty() {
        assert!(resolve_all(Path::new("/proj"), &[]).is_empty());
    }
}
