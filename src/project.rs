//! Project root discovery.
//!
//! A project is any directory containing a `.sasswatch` marker directory.
//! Watch and compile operations resolve relative paths against the root of
//! the project that owns them.

use std::path::{Path, PathBuf};

use crate::config::{CONFIG_DIR, Settings};

/// Maps paths to the project root that owns them.
pub trait ProjectLocator: Send + Sync {
    /// Project root for the given path, or `None` when the path does not
    /// belong to any known project.
    fn project_root_for(&self, path: &Path) -> Option<PathBuf>;

    /// Root of the currently active project, if any.
    fn active_root(&self) -> Option<PathBuf>;
}

/// Locates project roots by walking ancestors for a `.sasswatch` marker
/// directory.
pub struct WorkspaceLocator {
    root: Option<PathBuf>,
}

impl WorkspaceLocator {
    /// Discover the active project from the current directory.
    pub fn discover() -> Self {
        Self {
            root: Settings::workspace_root(),
        }
    }

    /// Use a known project root, skipping discovery.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// A locator with no active project.
    pub fn unrooted() -> Self {
        Self { root: None }
    }
}

impl ProjectLocator for WorkspaceLocator {
    fn project_root_for(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            // Nearest marker above the path wins, so nested projects
            // resolve to their own root.
            for ancestor in path.ancestors() {
                if ancestor.join(CONFIG_DIR).is_dir() {
                    return Some(ancestor.to_path_buf());
                }
            }
            return self
                .root
                .as_ref()
                .filter(|root| path.starts_with(root))
                .cloned();
        }

        // Relative paths are understood against the active project.
        self.root.clone()
    }

    fn active_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }
}
