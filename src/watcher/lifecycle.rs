//! The watch lifecycle: every way a directory enters or leaves the watched
//! set.
//!
//! Each operation keeps four collaborators in step: the ordered registry,
//! the watch service doing the real filesystem work, the persisted
//! directory list in project settings, and operator feedback (notifier,
//! log, status indicator). A failed settings save is surfaced but never
//! rolls the registry back; the running watches are the source of truth.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::config::CompilerConfig;
use crate::debug_event;
use crate::paths;
use crate::project::ProjectLocator;
use crate::report::{ConsoleLog, ConsoleNotifier, ConsoleStatus, LogSink, Notifier, StatusReporter};

use super::error::WatchError;
use super::persist::WatchPersistence;
use super::registry::{WatchEntry, WatchRegistry};
use super::service::WatchService;

/// Owns the watched-directory set and its side effects.
pub struct WatchLifecycle {
    registry: RwLock<WatchRegistry>,
    service: Arc<dyn WatchService>,
    persistence: Arc<dyn WatchPersistence>,
    locator: Arc<dyn ProjectLocator>,
    notifier: Arc<dyn Notifier>,
    log: Arc<dyn LogSink>,
    status: Arc<dyn StatusReporter>,
}

impl WatchLifecycle {
    /// Create a builder for configuring the lifecycle.
    pub fn builder() -> WatchLifecycleBuilder {
        WatchLifecycleBuilder::new()
    }

    /// Put a directory under watch.
    ///
    /// The directory is resolved against the project root that owns it;
    /// when no root can be located the operation aborts without feedback,
    /// matching a request made outside any project. Watching an
    /// already-watched directory is a harmless no-op that reports success
    /// again.
    pub async fn watch(&self, srcdir: &Path, config: &CompilerConfig) {
        let Some(project_root) = self.locator.project_root_for(srcdir) else {
            debug_event!(
                "lifecycle",
                "watch skipped, no project root",
                "{}",
                srcdir.display()
            );
            return;
        };
        let resolved = paths::resolve(&project_root, srcdir);
        let config = config.resolved_against(&project_root);

        match self.service.start_watch(&resolved, &config).await {
            Ok(handle) => {
                self.notifier
                    .info(&format!("About to watch directory {}", resolved.display()));
                let directories = self.directories_with(&resolved);
                self.persist(&directories).await;
                self.registry.write().add(resolved, handle);
                self.refresh_status();
            }
            Err(e) => {
                self.notifier.error(&e.to_string());
            }
        }
    }

    /// Take a directory out of the watched set.
    ///
    /// The saved list is updated before the registry entry goes away, so a
    /// crash between the two leaves the directory unwatched on restart.
    /// Unwatching a directory that was never watched produces a warning,
    /// not an error.
    pub async fn unwatch(&self, srcdir: &Path) {
        let Some(project_root) = self.locator.project_root_for(srcdir) else {
            debug_event!(
                "lifecycle",
                "unwatch skipped, no project root",
                "{}",
                srcdir.display()
            );
            return;
        };
        let resolved = paths::resolve(&project_root, srcdir);

        match self.service.stop_watch(&resolved).await {
            Ok(()) => {
                let remaining = self.directories_without(&resolved);
                self.persist(&remaining).await;
                let removed = self.registry.write().remove(&resolved);
                if removed {
                    self.notifier
                        .info(&format!("Directory {} unwatched now.", srcdir.display()));
                } else {
                    self.notifier.warn(&format!(
                        "Unable to clear watch for directory {}.",
                        srcdir.display()
                    ));
                }
                self.refresh_status();
            }
            Err(e) => {
                // Losing a watch that was never there is not worth an error.
                self.notifier.info(&e.to_string());
            }
        }
    }

    /// Describe the current watches: a detailed block in the log plus a
    /// one-line summary notification.
    pub fn list(&self) {
        let entries = self.registry.read().list();
        if entries.is_empty() {
            self.notifier.info("No watchers defined.");
            return;
        }

        let count = entries.len();
        self.log
            .append_line(&format!("******************* {count} watchers begin *********"));
        for entry in &entries {
            self.log
                .append_line(&format!("{} -> {}", entry.directory.display(), entry.handle));
        }
        self.log
            .append_line(&format!("******************* {count} watchers *********"));
        self.notifier.info(&format!(
            "Having {count} watchers. Check the log output for more details."
        ));
    }

    /// Quietly tear down one watch: no notification, no settings write.
    /// For paths where the session is going away rather than the operator
    /// shrinking the watched set.
    pub async fn stop(&self, directory: &Path) {
        self.teardown(directory).await;
        self.refresh_status();
    }

    /// Tear down every watch at once. Stays silent when there is nothing
    /// to clear.
    pub async fn clear_all(&self) {
        let directories = self.registry.read().directories();
        if directories.is_empty() {
            return;
        }

        self.notifier
            .info(&format!("Clearing {} sass watchers", directories.len()));
        for directory in &directories {
            self.teardown(directory).await;
        }
        self.refresh_status();
    }

    /// End-of-session teardown. The lifecycle stays usable afterwards;
    /// this only empties the watched set.
    pub async fn shutdown(&self) {
        self.clear_all().await;
    }

    /// Restart every persisted watch against the active project root.
    /// With no active project the watches are simply cleared.
    pub async fn restart(self: &Arc<Self>, config: &CompilerConfig) {
        match self.locator.active_root() {
            Some(root) => self.relaunch(&root, config).await,
            None => self.clear_all().await,
        }
    }

    /// Tear everything down, then start one watch per persisted directory.
    ///
    /// Startup failures are independent: a directory that cannot come back
    /// is reported and skipped while the rest proceed. The persisted list
    /// is the input here, so nothing is saved back.
    pub async fn relaunch(self: &Arc<Self>, project_root: &Path, config: &CompilerConfig) {
        let existing = self.registry.read().directories();
        for directory in &existing {
            self.teardown(directory).await;
        }

        let config = config.resolved_against(project_root);
        let mut tasks = JoinSet::new();
        for directory in paths::resolve_all(project_root, &config.watch_directories) {
            let lifecycle = Arc::clone(self);
            let config = config.clone();
            tasks.spawn(async move {
                let outcome = lifecycle.service.start_watch(&directory, &config).await;
                (directory, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((directory, outcome)) = joined else {
                continue;
            };
            match outcome {
                Ok(handle) => {
                    self.registry.write().add(directory, handle);
                    self.refresh_status();
                }
                Err(e) => {
                    self.notifier.error(&e.to_string());
                }
            }
        }
    }

    /// Number of directories currently watched.
    pub fn watch_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Watched directories in the order they were added.
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        self.registry.read().directories()
    }

    /// Snapshot of the registry entries.
    pub fn entries(&self) -> Vec<WatchEntry> {
        self.registry.read().list()
    }

    /// Best-effort stop plus registry removal. Stop failures only reach
    /// the log; the registry entry goes away regardless.
    async fn teardown(&self, directory: &Path) {
        if let Err(e) = self.service.stop_watch(directory).await {
            self.log.append_line(&format!(
                "Unable to stop watch for {}: {e}",
                directory.display()
            ));
        }
        self.registry.write().remove(directory);
    }

    /// Save the directory list. A failed save is surfaced to the operator
    /// but never undoes registry changes.
    async fn persist(&self, directories: &[PathBuf]) {
        match self.persistence.save_watch_directories(directories).await {
            Ok(()) => {
                self.log
                    .append_line(&format!("Updated watch_directories to {directories:?}"));
            }
            Err(e) => {
                self.notifier
                    .error(&format!("Failed to update watch_directories: {e}"));
            }
        }
    }

    /// The registry keys as they would look with `directory` added.
    fn directories_with(&self, directory: &Path) -> Vec<PathBuf> {
        let registry = self.registry.read();
        let mut directories = registry.directories();
        if !registry.contains(directory) {
            directories.push(directory.to_path_buf());
        }
        directories
    }

    /// The registry keys as they would look with `directory` removed.
    fn directories_without(&self, directory: &Path) -> Vec<PathBuf> {
        self.registry
            .read()
            .directories()
            .into_iter()
            .filter(|dir| dir != directory)
            .collect()
    }

    fn refresh_status(&self) {
        self.status.refresh(self.registry.read().len());
    }
}

/// Builder for constructing a WatchLifecycle.
pub struct WatchLifecycleBuilder {
    service: Option<Arc<dyn WatchService>>,
    persistence: Option<Arc<dyn WatchPersistence>>,
    locator: Option<Arc<dyn ProjectLocator>>,
    notifier: Option<Arc<dyn Notifier>>,
    log: Option<Arc<dyn LogSink>>,
    status: Option<Arc<dyn StatusReporter>>,
}

impl WatchLifecycleBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            service: None,
            persistence: None,
            locator: None,
            notifier: None,
            log: None,
            status: None,
        }
    }

    /// Set the watch service.
    pub fn service(mut self, service: Arc<dyn WatchService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the settings persistence.
    pub fn persistence(mut self, persistence: Arc<dyn WatchPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Set the project locator.
    pub fn locator(mut self, locator: Arc<dyn ProjectLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Set the notifier. Defaults to the console.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the detail log. Defaults to tracing output.
    pub fn log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = Some(log);
        self
    }

    /// Set the status reporter. Defaults to the console.
    pub fn status(mut self, status: Arc<dyn StatusReporter>) -> Self {
        self.status = Some(status);
        self
    }

    /// Build the WatchLifecycle.
    pub fn build(self) -> Result<WatchLifecycle, WatchError> {
        let service = self.service.ok_or_else(|| WatchError::InitFailed {
            reason: "Watch service is required".to_string(),
        })?;

        let persistence = self.persistence.ok_or_else(|| WatchError::InitFailed {
            reason: "Persistence is required".to_string(),
        })?;

        let locator = self.locator.ok_or_else(|| WatchError::InitFailed {
            reason: "Project locator is required".to_string(),
        })?;

        Ok(WatchLifecycle {
            registry: RwLock::new(WatchRegistry::new()),
            service,
            persistence,
            locator,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(ConsoleNotifier)),
            log: self.log.unwrap_or_else(|| Arc::new(ConsoleLog)),
            status: self
                .status
                .unwrap_or_else(|| Arc::new(ConsoleStatus::default())),
        })
    }
}

impl Default for WatchLifecycleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
