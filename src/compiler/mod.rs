//! Sass compilation through an external dart-sass executable.
//!
//! [`Compiler`] is the seam shared by the one-shot CLI path and the
//! directory watcher; [`DartSassCompiler`] is the production implementation
//! that shells out to `sass`. Each compiled stylesheet produces `name.css`
//! and, unless disabled, `name.min.css` next to the input.

pub mod dart_sass;

pub use dart_sass::DartSassCompiler;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::CompilerConfig;

/// Everything a single compiler invocation needs beyond the input path.
#[derive(Debug, Clone)]
pub struct CompileContext {
    /// Directory the compiler process runs in.
    pub working_directory: PathBuf,
    /// Extra load paths for `@use`/`@import` resolution.
    pub include_paths: Vec<PathBuf>,
    /// Whether to produce the `.min.css` artifact as well.
    pub emit_minified: bool,
}

impl CompileContext {
    /// Build a context from compiler config that has already been resolved
    /// against a project root (see [`CompilerConfig::resolved_against`]).
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            working_directory: config
                .sass_working_directory
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            include_paths: config.include_path.clone(),
            emit_minified: !config.disable_minified,
        }
    }
}

/// Artifacts produced by one successful compilation.
#[derive(Debug, Clone, Serialize)]
pub struct CompileOutput {
    /// The expanded stylesheet.
    pub css: PathBuf,
    /// The compressed stylesheet, when minification is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_css: Option<PathBuf>,
    /// Wall time for the whole compilation.
    pub elapsed_ms: u64,
}

/// Location and message of a compiler failure, as reported by dart-sass.
#[derive(Debug, Clone, Serialize)]
pub struct SassDiagnostic {
    /// File the error occurred in, when the compiler named one.
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// The full formatted message, including the source snippet.
    pub formatted: String,
}

impl fmt::Display for SassDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{line}:{column} {}", self.formatted),
            _ => write!(f, "{}", self.formatted),
        }
    }
}

#[derive(Error, Debug)]
pub enum CompileError {
    /// The sass executable could not be started.
    #[error("unable to launch `{binary}`: {source}")]
    Launch {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiler rejected the stylesheet.
    #[error("{0}")]
    Sass(SassDiagnostic),

    /// Partials and non-sass files are never compiled standalone.
    #[error("not a compilable sass file: {path}")]
    NotCompilable { path: PathBuf },

    /// The executable ran but did not report a version.
    #[error("`{binary}` did not report a version: {reason}")]
    Version { binary: PathBuf, reason: String },
}

/// Compiles stylesheets. Implementations must be shareable across tasks.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile one stylesheet into `name.css` (and `name.min.css` when the
    /// context asks for it) next to the input.
    async fn compile_file(
        &self,
        input: &Path,
        context: &CompileContext,
    ) -> Result<CompileOutput, CompileError>;

    /// Version string of the underlying compiler.
    async fn version(&self) -> Result<String, CompileError>;
}

/// Any `.scss`/`.sass` file, partials included.
pub fn is_stylesheet(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("scss") || ext.eq_ignore_ascii_case("sass")
    )
}

/// True for stylesheets that compile standalone, i.e. not partials.
pub fn is_compilable(path: &Path) -> bool {
    is_stylesheet(path) && !is_partial(path)
}

/// Partials (basename starting with `_`) are only ever pulled in through
/// `@use`/`@import`, never compiled on their own.
pub fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('_'))
}

/// The operator-facing message for a failed compilation.
pub fn failure_message(input: &Path, error: &CompileError) -> String {
    let fileonly = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    format!("Error compiling scss file {fileonly}: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scss_and_sass_files_are_compilable() {
        assert!(is_compilable(Path::new("styles/app.scss")));
        assert!(is_compilable(Path::new("styles/app.sass")));
        assert!(is_compilable(Path::new("styles/APP.SCSS")));
    }

    #[test]
    fn test_partials_are_not_compilable() {
        assert!(is_partial(Path::new("styles/_mixins.scss")));
        assert!(!is_compilable(Path::new("styles/_mixins.scss")));
        // Only the basename counts, not parent directories
        assert!(!is_partial(Path::new("_vendor/app.scss")));
        assert!(is_compilable(Path::new("_vendor/app.scss")));
    }

    #[test]
    fn test_other_extensions_are_ignored() {
        assert!(!is_compilable(Path::new("styles/app.css")));
        assert!(!is_compilable(Path::new("styles/app.scss.swp")));
        assert!(!is_compilable(Path::new("README.md")));
        assert!(!is_compilable(Path::new("styles")));
    }

    #[test]
    fn test_diagnostic_display_includes_location() {
        let diagnostic = SassDiagnostic {
            file: Some(PathBuf::from("app.scss")),
            line: Some(3),
            column: Some(14),
            formatted: "Error: Undefined variable.".to_string(),
        };
        assert_eq!(diagnostic.to_string(), "3:14 Error: Undefined variable.");
    }

    #[test]
    fn test_diagnostic_display_without_location() {
        let diagnostic = SassDiagnostic {
            file: None,
            line: None,
            column: None,
            formatted: "Error: expected expression.".to_string(),
        };
        assert_eq!(diagnostic.to_string(), "Error: expected expression.");
    }

    #[test]
    fn test_failure_message_names_the_file_only() {
        let error = CompileError::Sass(SassDiagnostic {
            file: Some(PathBuf::from("styles/app.scss")),
            line: Some(3),
            column: Some(14),
            formatted: "Error: Undefined variable.".to_string(),
        });
        assert_eq!(
            failure_message(Path::new("/proj/styles/app.scss"), &error),
            "Error compiling scss file app.scss: 3:14 Error: Undefined variable."
        );
    }

    #[test]
    fn test_context_defaults_to_minified() {
        let context = CompileContext::from_config(&CompilerConfig::default());
        assert!(context.emit_minified);
        assert!(context.include_paths.is_empty());
    }

    #[test]
    fn test_context_honors_disable_minified() {
        let config = CompilerConfig {
            disable_minified: true,
            ..CompilerConfig::default()
        };
        let context = CompileContext::from_config(&config);
        assert!(!context.emit_minified);
    }
}
