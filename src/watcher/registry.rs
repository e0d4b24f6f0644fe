//! Ordered registry of directories under watch.
//!
//! Insertion order is preserved so listings and the persisted directory
//! list always read in the order watches were added.

use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of one running watch, assigned by the watch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One watched directory with its service handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub directory: PathBuf,
    pub handle: WatchHandle,
}

/// Directory to entry map, iterated in insertion order.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    entries: IndexMap<PathBuf, WatchEntry>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watch. Re-adding a directory replaces its handle and
    /// keeps the original position.
    pub fn add(&mut self, directory: PathBuf, handle: WatchHandle) {
        self.entries
            .insert(directory.clone(), WatchEntry { directory, handle });
    }

    /// Remove a watch. Returns false when the directory was not present.
    /// Remaining entries keep their relative order.
    pub fn remove(&mut self, directory: &Path) -> bool {
        self.entries.shift_remove(directory).is_some()
    }

    pub fn contains(&self, directory: &Path) -> bool {
        self.entries.contains_key(directory)
    }

    /// Snapshot of all entries in insertion order.
    pub fn list(&self) -> Vec<WatchEntry> {
        self.entries.values().cloned().collect()
    }

    /// Watched directories in insertion order.
    pub fn directories(&self) -> Vec<PathBuf> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
