pub mod cli;
pub mod compiler;
pub mod config;
pub mod logging;
pub mod paths;
pub mod project;
pub mod report;
pub mod watcher;

pub use compiler::{CompileContext, CompileError, CompileOutput, Compiler, DartSassCompiler};
pub use config::{CompilerConfig, Settings};
pub use project::{ProjectLocator, WorkspaceLocator};
pub use watcher::{WatchError, WatchHandle, WatchLifecycle, WatchRegistry};
