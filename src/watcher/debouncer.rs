//! Debouncing for stylesheet change events.
//!
//! Editors save the same file several times in quick succession (auto-save,
//! format-on-save), and a full compile per event would thrash the external
//! compiler. A path is only handed out once it has stayed quiet for the
//! configured duration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Debounces change events by path.
///
/// Records change timestamps and returns paths that have been stable
/// for the configured duration.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending changes: path -> last change timestamp.
    pending: HashMap<PathBuf, Instant>,
    /// How long a file must be stable before compiling.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record a change event, resetting the timer for this path.
    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path, Instant::now());
    }

    /// Forget a path (e.g. when the file is deleted).
    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Take all paths that have been stable for the debounce duration.
    ///
    /// Returned paths are removed from pending.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|path, last_change| {
            if now.duration_since(*last_change) >= self.duration {
                ready.push(path.clone());
                false // Remove from pending
            } else {
                true // Keep in pending
            }
        });

        ready
    }

    /// Check if there are any pending changes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_change_not_ready_until_quiet() {
        let mut debouncer = Debouncer::new(50); // 50ms debounce

        let path = PathBuf::from("/proj/styles/app.scss");
        debouncer.record(path.clone());

        // Immediately after, nothing should be ready
        assert!(debouncer.take_ready().is_empty());
        assert!(debouncer.has_pending());

        // Wait for the debounce period
        sleep(Duration::from_millis(60));

        let ready = debouncer.take_ready();
        assert_eq!(ready, vec![path]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_new_save_resets_timer() {
        let mut debouncer = Debouncer::new(50);

        let path = PathBuf::from("/proj/styles/app.scss");
        debouncer.record(path.clone());

        // Save again halfway through the quiet period
        sleep(Duration::from_millis(30));
        debouncer.record(path.clone());

        // 60ms since the first save, only 30ms since the second
        sleep(Duration::from_millis(30));
        assert!(debouncer.take_ready().is_empty());

        sleep(Duration::from_millis(30));
        assert_eq!(debouncer.take_ready(), vec![path]);
    }

    #[test]
    fn test_files_become_ready_independently() {
        let mut debouncer = Debouncer::new(50);

        let first = PathBuf::from("/proj/styles/app.scss");
        let second = PathBuf::from("/proj/styles/print.scss");

        debouncer.record(first.clone());
        sleep(Duration::from_millis(30));
        debouncer.record(second.clone());

        // 55ms from the first save, 25ms from the second
        sleep(Duration::from_millis(25));
        assert_eq!(debouncer.take_ready(), vec![first]);
        assert!(debouncer.has_pending());

        sleep(Duration::from_millis(30));
        assert_eq!(debouncer.take_ready(), vec![second]);
    }

    #[test]
    fn test_removed_file_is_forgotten() {
        let mut debouncer = Debouncer::new(50);

        let path = PathBuf::from("/proj/styles/app.scss");
        debouncer.record(path.clone());
        assert!(debouncer.has_pending());

        debouncer.remove(&path);
        assert!(!debouncer.has_pending());

        sleep(Duration::from_millis(60));
        assert!(debouncer.take_ready().is_empty());
    }
}
