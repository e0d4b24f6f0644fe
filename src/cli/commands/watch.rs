//! The long-running watch session.
//!
//! Relaunches every persisted watch, adds any directories given on the
//! command line, then stays up until Ctrl-C. While running, the session
//! follows `watch_directories` in settings.toml: edits made by `add-dir`,
//! `remove-dir`, or a text editor in another terminal are applied live.
//! Other settings still need a restart.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::compiler::DartSassCompiler;
use crate::config::{CompilerConfig, Settings};
use crate::log_event;
use crate::paths;
use crate::project::WorkspaceLocator;
use crate::watcher::{NotifyWatchService, SettingsPersistence, WatchLifecycle};

/// Run watch command - start watches and keep them until interrupted.
pub async fn run_watch(extra_dirs: Vec<PathBuf>, config_path: &Path, settings: &Settings) {
    let Some(project_root) = settings.workspace_root.clone() else {
        eprintln!("Error: No project found. Run 'sasswatch init' first.");
        std::process::exit(1);
    };

    let compiler = Arc::new(DartSassCompiler::from_config(&settings.compiler));
    let service = Arc::new(NotifyWatchService::new(compiler, settings.watcher.debounce_ms));
    let lifecycle = WatchLifecycle::builder()
        .service(service)
        .persistence(Arc::new(SettingsPersistence::new(config_path)))
        .locator(Arc::new(WorkspaceLocator::with_root(project_root.clone())))
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });
    let lifecycle = Arc::new(lifecycle);

    lifecycle.relaunch(&project_root, &settings.compiler).await;
    for directory in &extra_dirs {
        lifecycle.watch(directory, &settings.compiler).await;
    }
    lifecycle.list();

    log_event!("session", "running", "press Ctrl-C to stop");

    match SettingsReconciler::new(config_path, &project_root, lifecycle.watched_directories()) {
        Ok(mut reconciler) => loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                delta = reconciler.next_delta() => {
                    apply_delta(&lifecycle, delta).await;
                    reconciler.sync_to(lifecycle.watched_directories());
                }
            }
        },
        Err(e) => {
            tracing::warn!("[session] live settings reload disabled: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }

    println!();
    lifecycle.shutdown().await;
}

async fn apply_delta(lifecycle: &Arc<WatchLifecycle>, delta: SettingsDelta) {
    log_event!(
        "session",
        "watch_directories changed",
        "{} added, {} removed",
        delta.added.len(),
        delta.removed.len()
    );
    for directory in &delta.removed {
        lifecycle.unwatch(directory).await;
    }
    for directory in &delta.added {
        lifecycle.watch(directory, &delta.compiler).await;
    }
}

/// A change to the persisted watch list, with the compiler config that
/// was in the file alongside it.
struct SettingsDelta {
    added: Vec<PathBuf>,
    removed: Vec<PathBuf>,
    compiler: CompilerConfig,
}

/// Follows the settings file while the session runs.
///
/// Paths are compared after resolution against the project root, so the
/// rewrite the lifecycle itself performs on every persist (absolute paths
/// for relative entries) never reads back as a change.
struct SettingsReconciler {
    settings_path: PathBuf,
    project_root: PathBuf,
    last: Vec<PathBuf>,
    rx: mpsc::Receiver<()>,
    _watcher: RecommendedWatcher,
}

impl SettingsReconciler {
    fn new(
        settings_path: &Path,
        project_root: &Path,
        current: Vec<PathBuf>,
    ) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel(16);
        let file_name = settings_path.file_name().map(|name| name.to_os_string());

        // Watch the parent directory: editors replace files on save, and a
        // watch on the file itself would not survive the rename.
        let mut watcher =
            notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else { return };
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                let relevant = event
                    .paths
                    .iter()
                    .any(|path| path.file_name() == file_name.as_deref());
                if relevant {
                    let _ = tx.blocking_send(());
                }
            })?;

        let watch_dir = settings_path.parent().unwrap_or(Path::new("."));
        watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            settings_path: settings_path.to_path_buf(),
            project_root: project_root.to_path_buf(),
            last: current,
            rx,
            _watcher: watcher,
        })
    }

    /// Wait for the next effective change to `watch_directories`.
    ///
    /// Never resolves once the file watcher is gone, leaving Ctrl-C as the
    /// only way out of the session loop.
    async fn next_delta(&mut self) -> SettingsDelta {
        loop {
            if self.rx.recv().await.is_none() {
                std::future::pending::<()>().await;
            }

            // Let the write settle, then fold the rest of the burst in.
            tokio::time::sleep(Duration::from_millis(200)).await;
            while self.rx.try_recv().is_ok() {}

            let settings = match Settings::load_from(&self.settings_path) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("[session] settings unreadable, keeping current watches: {e}");
                    continue;
                }
            };

            let current =
                paths::resolve_all(&self.project_root, &settings.compiler.watch_directories);
            let (added, removed) = diff_directories(&self.last, &current);
            self.last = current;

            if added.is_empty() && removed.is_empty() {
                continue;
            }
            return SettingsDelta {
                added,
                removed,
                compiler: settings.compiler,
            };
        }
    }

    /// Reset the comparison base to what is actually watched, so a watch
    /// that failed to start is offered again on the next reload instead of
    /// being counted as live.
    fn sync_to(&mut self, directories: Vec<PathBuf>) {
        self.last = directories;
    }
}

fn diff_directories(previous: &[PathBuf], current: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let previous_set: HashSet<&PathBuf> = previous.iter().collect();
    let current_set: HashSet<&PathBuf> = current.iter().collect();

    let added = current
        .iter()
        .filter(|directory| !previous_set.contains(*directory))
        .cloned()
        .collect();
    let removed = previous
        .iter()
        .filter(|directory| !current_set.contains(*directory))
        .cloned()
        .collect();
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_diff_reports_added_and_removed() {
        let previous = vec![PathBuf::from("/proj/a"), PathBuf::from("/proj/b")];
        let current = vec![PathBuf::from("/proj/b"), PathBuf::from("/proj/c")];

        let (added, removed) = diff_directories(&previous, &current);

        assert_eq!(added, vec![PathBuf::from("/proj/c")]);
        assert_eq!(removed, vec![PathBuf::from("/proj/a")]);
    }

    #[test]
    fn test_diff_ignores_reordering() {
        let previous = vec![PathBuf::from("/proj/a"), PathBuf::from("/proj/b")];
        let current = vec![PathBuf::from("/proj/b"), PathBuf::from("/proj/a")];

        let (added, removed) = diff_directories(&previous, &current);

        assert!(added.is_empty());
        assert!(removed.is_empty());
    }

    #[test]
    fn test_diff_of_empty_lists() {
        let (added, removed) = diff_directories(&[], &[]);
        assert!(added.is_empty());
        assert!(removed.is_empty());

        let (added, removed) = diff_directories(&[], &[PathBuf::from("/proj/a")]);
        assert_eq!(added, vec![PathBuf::from("/proj/a")]);
        assert!(removed.is_empty());
    }

    fn settings_with_dirs(directories: &[&str]) -> Settings {
        let mut settings = Settings::default();
        settings.compiler.watch_directories = directories.iter().map(PathBuf::from).collect();
        settings
    }

    #[tokio::test]
    async fn test_reconciler_reports_resolved_delta() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let settings_path = root.join("settings.toml");
        settings_with_dirs(&["styles"]).save(&settings_path).unwrap();

        let mut reconciler =
            SettingsReconciler::new(&settings_path, &root, vec![root.join("styles")]).unwrap();

        // add-dir in another terminal appends a directory
        settings_with_dirs(&["styles", "web/scss"])
            .save(&settings_path)
            .unwrap();

        let delta = tokio::time::timeout(Duration::from_secs(5), reconciler.next_delta())
            .await
            .expect("settings rewrite should produce a delta");
        assert_eq!(delta.added, vec![root.join("web/scss")]);
        assert!(delta.removed.is_empty());
        assert_eq!(
            delta.compiler.watch_directories,
            vec![PathBuf::from("styles"), PathBuf::from("web/scss")]
        );
    }

    #[tokio::test]
    async fn test_reconciler_keeps_base_when_settings_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let settings_path = root.join("settings.toml");
        settings_with_dirs(&["styles"]).save(&settings_path).unwrap();

        let mut reconciler =
            SettingsReconciler::new(&settings_path, &root, vec![root.join("styles")]).unwrap();

        // A half-written file wakes the reconciler but must not produce a
        // delta or disturb the comparison base
        std::fs::write(&settings_path, "[compiler\nwatch_directories = ").unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(800), reconciler.next_delta()).await;
        assert!(waited.is_err(), "unreadable settings must not yield a delta");

        // The next valid write diffs against the base from before the
        // corruption, not an empty or partial read
        settings_with_dirs(&["web/scss"]).save(&settings_path).unwrap();

        let delta = tokio::time::timeout(Duration::from_secs(5), reconciler.next_delta())
            .await
            .expect("valid settings rewrite should produce a delta");
        assert_eq!(delta.added, vec![root.join("web/scss")]);
        assert_eq!(delta.removed, vec![root.join("styles")]);
    }

    #[tokio::test]
    async fn test_sync_to_retries_watch_that_failed_to_start() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let settings_path = root.join("settings.toml");
        settings_with_dirs(&["styles", "web/scss"])
            .save(&settings_path)
            .unwrap();

        // Only styles actually came up at relaunch
        let mut reconciler =
            SettingsReconciler::new(&settings_path, &root, vec![root.join("styles")]).unwrap();

        // Editors replace the file on save; the parent-directory watch
        // must survive the rename
        let staged = root.join("settings.toml.new");
        std::fs::copy(&settings_path, &staged).unwrap();
        std::fs::rename(&staged, &settings_path).unwrap();

        let delta = tokio::time::timeout(Duration::from_secs(5), reconciler.next_delta())
            .await
            .expect("settings rewrite should produce a delta");
        assert_eq!(delta.added, vec![root.join("web/scss")]);

        // The watch failed again: resetting the base to what is watched
        // keeps the directory in play for the next touch
        reconciler.sync_to(vec![root.join("styles")]);
        std::fs::copy(&settings_path, &staged).unwrap();
        std::fs::rename(&staged, &settings_path).unwrap();

        let delta = tokio::time::timeout(Duration::from_secs(5), reconciler.next_delta())
            .await
            .expect("settings rewrite should produce a delta");
        assert_eq!(delta.added, vec![root.join("web/scss")]);
    }
}
