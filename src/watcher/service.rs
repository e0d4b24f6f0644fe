//! Starting and stopping real directory watches.
//!
//! [`NotifyWatchService`] owns one notify watcher and one compile task per
//! watched directory. Dropping the notify watcher deregisters the OS-level
//! watch, so watcher and task live and die together in an `ActiveWatch`.

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use walkdir::WalkDir;

use crate::compiler::{
    CompileContext, Compiler, failure_message, is_compilable, is_stylesheet,
};
use crate::config::CompilerConfig;
use crate::{debug_event, log_event};

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::registry::WatchHandle;

/// Starts and stops watches on directories.
#[async_trait]
pub trait WatchService: Send + Sync {
    /// Begin watching a directory, compiling stylesheets as they change.
    /// Watching an already-watched directory returns the existing handle.
    async fn start_watch(
        &self,
        directory: &Path,
        config: &CompilerConfig,
    ) -> Result<WatchHandle, WatchError>;

    /// Stop the watch on a directory. Fails when no watch is active.
    async fn stop_watch(&self, directory: &Path) -> Result<(), WatchError>;
}

struct ActiveWatch {
    handle: WatchHandle,
    /// Dropping this deregisters the OS watch.
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

/// The production watch service, backed by notify.
pub struct NotifyWatchService {
    compiler: Arc<dyn Compiler>,
    debounce_ms: u64,
    next_handle: AtomicU64,
    active: Mutex<HashMap<PathBuf, ActiveWatch>>,
}

impl NotifyWatchService {
    pub fn new(compiler: Arc<dyn Compiler>, debounce_ms: u64) -> Self {
        Self {
            compiler,
            debounce_ms,
            next_handle: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Number of directories with a running watch.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

#[async_trait]
impl WatchService for NotifyWatchService {
    async fn start_watch(
        &self,
        directory: &Path,
        config: &CompilerConfig,
    ) -> Result<WatchHandle, WatchError> {
        let mut active = self.active.lock();

        if let Some(existing) = active.get(directory) {
            return Ok(existing.handle);
        }

        if !directory.is_dir() {
            return Err(WatchError::PathWatchFailed {
                path: directory.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(100);
        let mut watcher =
            notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
                // Blocking send applies backpressure from the notify thread.
                let _ = tx.blocking_send(result);
            })?;

        watcher
            .watch(directory, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: directory.to_path_buf(),
                reason: e.to_string(),
            })?;

        let handle = WatchHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let task = tokio::spawn(compile_loop(
            directory.to_path_buf(),
            rx,
            Arc::clone(&self.compiler),
            CompileContext::from_config(config),
            self.debounce_ms,
        ));

        active.insert(
            directory.to_path_buf(),
            ActiveWatch {
                handle,
                _watcher: watcher,
                task,
            },
        );
        log_event!("watcher", "watching", "{}", directory.display());
        Ok(handle)
    }

    async fn stop_watch(&self, directory: &Path) -> Result<(), WatchError> {
        match self.active.lock().remove(directory) {
            Some(watch) => {
                watch.task.abort();
                log_event!("watcher", "stopped", "{}", directory.display());
                Ok(())
            }
            None => Err(WatchError::NotWatching {
                path: directory.to_path_buf(),
            }),
        }
    }
}

/// Per-directory event loop: one full pass over existing stylesheets, then
/// debounced recompiles as they change.
async fn compile_loop(
    directory: PathBuf,
    mut rx: mpsc::Receiver<Result<Event, notify::Error>>,
    compiler: Arc<dyn Compiler>,
    context: CompileContext,
    debounce_ms: u64,
) {
    for path in compilable_files(&directory) {
        compile_one(&path, compiler.as_ref(), &context).await;
    }

    let mut debouncer = Debouncer::new(debounce_ms);

    loop {
        // Periodic check for debounced events
        let timeout = sleep(Duration::from_millis(100));
        tokio::pin!(timeout);

        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(Ok(event)) => note_event(&directory, event, &mut debouncer),
                    Some(Err(e)) => {
                        tracing::error!("[watcher] event error on {}: {e}", directory.display());
                    }
                    None => break,
                }
            }

            _ = &mut timeout => {
                for path in debouncer.take_ready() {
                    // Gone between debounce and compile; outputs are
                    // left alone.
                    if !path.exists() {
                        continue;
                    }
                    compile_one(&path, compiler.as_ref(), &context).await;
                }
            }
        }
    }

    debug_event!("watcher", "loop ended", "{}", directory.display());
}

/// Translate one notify event into debouncer updates.
///
/// A changed partial cannot be compiled itself and its dependents are
/// unknown, so every root stylesheet in the directory goes stale.
fn note_event(directory: &Path, event: Event, debouncer: &mut Debouncer) {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {
            for path in event.paths {
                if is_compilable(&path) {
                    debouncer.record(path);
                } else if is_stylesheet(&path) {
                    for root in compilable_files(directory) {
                        debouncer.record(root);
                    }
                }
            }
        }
        EventKind::Remove(_) => {
            for path in event.paths {
                debouncer.remove(&path);
            }
        }
        _ => {}
    }
}

async fn compile_one(path: &Path, compiler: &dyn Compiler, context: &CompileContext) {
    match compiler.compile_file(path, context).await {
        Ok(output) => {
            log_event!(
                "watcher",
                "compiled",
                "{} ({}ms)",
                output.css.display(),
                output.elapsed_ms
            );
        }
        Err(e) => {
            tracing::error!("{}", failure_message(path, &e));
        }
    }
}

/// All non-partial stylesheets under a directory.
fn compilable_files(directory: &Path) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_compilable(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileError, CompileOutput};
    use std::fs;
    use tempfile::TempDir;

    struct FakeCompiler {
        compiled: Mutex<Vec<PathBuf>>,
    }

    impl FakeCompiler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                compiled: Mutex::new(Vec::new()),
            })
        }

        fn compiled(&self) -> Vec<PathBuf> {
            self.compiled.lock().clone()
        }
    }

    #[async_trait]
    impl Compiler for FakeCompiler {
        async fn compile_file(
            &self,
            input: &Path,
            _context: &CompileContext,
        ) -> Result<CompileOutput, CompileError> {
            self.compiled.lock().push(input.to_path_buf());
            Ok(CompileOutput {
                css: input.with_extension("css"),
                min_css: None,
                elapsed_ms: 0,
            })
        }

        async fn version(&self) -> Result<String, CompileError> {
            Ok("fake 0.0.0".to_string())
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_start_watch_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let service = NotifyWatchService::new(FakeCompiler::new(), 50);

        let first = service
            .start_watch(temp_dir.path(), &CompilerConfig::default())
            .await
            .unwrap();
        let second = service
            .start_watch(temp_dir.path(), &CompilerConfig::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(service.active_count(), 1);
    }

    #[tokio::test]
    async fn test_start_watch_rejects_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let service = NotifyWatchService::new(FakeCompiler::new(), 50);

        let missing = temp_dir.path().join("not-here");
        let err = service
            .start_watch(&missing, &CompilerConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::PathWatchFailed { .. }));
        assert_eq!(service.active_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_watch_requires_active_watch() {
        let temp_dir = TempDir::new().unwrap();
        let service = NotifyWatchService::new(FakeCompiler::new(), 50);

        let err = service.stop_watch(temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, WatchError::NotWatching { .. }));
    }

    #[tokio::test]
    async fn test_start_then_stop_releases_watch() {
        let temp_dir = TempDir::new().unwrap();
        let service = NotifyWatchService::new(FakeCompiler::new(), 50);

        service
            .start_watch(temp_dir.path(), &CompilerConfig::default())
            .await
            .unwrap();
        service.stop_watch(temp_dir.path()).await.unwrap();

        assert_eq!(service.active_count(), 0);
        assert!(service.stop_watch(temp_dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_initial_pass_compiles_existing_sources() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("app.scss"), "body { margin: 0 }").unwrap();
        fs::write(temp_dir.path().join("site.sass"), "body\n  margin: 0").unwrap();
        fs::write(temp_dir.path().join("_theme.scss"), "$accent: #333;").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "not a stylesheet").unwrap();

        let compiler = FakeCompiler::new();
        let service = NotifyWatchService::new(Arc::clone(&compiler) as Arc<dyn Compiler>, 50);

        service
            .start_watch(temp_dir.path(), &CompilerConfig::default())
            .await
            .unwrap();

        assert!(wait_until(|| compiler.compiled().len() == 2).await);
        let compiled = compiler.compiled();
        assert!(compiled.contains(&temp_dir.path().join("app.scss")));
        assert!(compiled.contains(&temp_dir.path().join("site.sass")));
    }

    #[tokio::test]
    async fn test_change_triggers_recompile() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("app.scss");
        fs::write(&input, "body { margin: 0 }").unwrap();

        let compiler = FakeCompiler::new();
        let service = NotifyWatchService::new(Arc::clone(&compiler) as Arc<dyn Compiler>, 50);

        service
            .start_watch(temp_dir.path(), &CompilerConfig::default())
            .await
            .unwrap();
        assert!(wait_until(|| !compiler.compiled().is_empty()).await);

        fs::write(&input, "body { margin: 1px }").unwrap();

        let expected = input.clone();
        assert!(
            wait_until(|| {
                compiler
                    .compiled()
                    .iter()
                    .filter(|path| **path == expected)
                    .count()
                    >= 2
            })
            .await
        );
    }

    #[tokio::test]
    async fn test_partial_change_recompiles_roots() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("app.scss");
        let partial = temp_dir.path().join("_theme.scss");
        fs::write(&root, "@use 'theme';\nbody { margin: 0 }").unwrap();
        fs::write(&partial, "$accent: #333;").unwrap();

        let compiler = FakeCompiler::new();
        let service = NotifyWatchService::new(Arc::clone(&compiler) as Arc<dyn Compiler>, 50);

        service
            .start_watch(temp_dir.path(), &CompilerConfig::default())
            .await
            .unwrap();
        assert!(wait_until(|| !compiler.compiled().is_empty()).await);

        fs::write(&partial, "$accent: #444;").unwrap();

        let expected = root.clone();
        assert!(
            wait_until(|| {
                compiler
                    .compiled()
                    .iter()
                    .filter(|path| **path == expected)
                    .count()
                    >= 2
            })
            .await
        );
        // The partial itself is never compiled
        assert!(!compiler.compiled().contains(&partial));
    }
}
