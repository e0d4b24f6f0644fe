//! The production compiler: shells out to the dart-sass CLI.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;
use tokio::process::Command;

use crate::config::CompilerConfig;
use crate::debug_event;

use super::{CompileContext, CompileError, CompileOutput, Compiler, SassDiagnostic, is_compilable};

/// Invokes the `sass` executable once per output style.
///
/// dart-sass has no "write both styles" mode, so a compilation is two runs:
/// `--style=expanded` for `name.css`, then `--style=compressed` for
/// `name.min.css`. The second run is skipped when the first fails.
pub struct DartSassCompiler {
    binary: PathBuf,
}

impl DartSassCompiler {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.sass_bin.clone())
    }

    async fn run_once(
        &self,
        input: &Path,
        output: &Path,
        style: &str,
        context: &CompileContext,
    ) -> Result<(), CompileError> {
        let mut command = Command::new(&self.binary);
        command
            .arg(format!("--style={style}"))
            .arg("--no-source-map");
        for include in &context.include_paths {
            command.arg(format!("--load-path={}", include.display()));
        }
        command
            .arg(input)
            .arg(output)
            .current_dir(&context.working_directory);

        let result = command
            .output()
            .await
            .map_err(|source| CompileError::Launch {
                binary: self.binary.clone(),
                source,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CompileError::Sass(parse_diagnostic(&stderr)));
        }
        Ok(())
    }
}

#[async_trait]
impl Compiler for DartSassCompiler {
    async fn compile_file(
        &self,
        input: &Path,
        context: &CompileContext,
    ) -> Result<CompileOutput, CompileError> {
        if !is_compilable(input) {
            return Err(CompileError::NotCompilable {
                path: input.to_path_buf(),
            });
        }

        let started = Instant::now();
        let (css, min_css) = output_paths(input);

        self.run_once(input, &css, "expanded", context).await?;
        debug_event!("compiler", "compiled", "{} -> {}", input.display(), css.display());

        let min_css = if context.emit_minified {
            self.run_once(input, &min_css, "compressed", context).await?;
            debug_event!(
                "compiler",
                "compiled",
                "{} -> {}",
                input.display(),
                min_css.display()
            );
            Some(min_css)
        } else {
            None
        };

        Ok(CompileOutput {
            css,
            min_css,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn version(&self) -> Result<String, CompileError> {
        let result = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|source| CompileError::Launch {
                binary: self.binary.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(CompileError::Version {
                binary: self.binary.clone(),
                reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&result.stdout).trim().to_string())
    }
}

/// Outputs land next to the input: `app.scss` becomes `app.css` and
/// `app.min.css`.
fn output_paths(input: &Path) -> (PathBuf, PathBuf) {
    let css = input.with_extension("css");
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let min_css = input.with_file_name(format!("{stem}.min.css"));
    (css, min_css)
}

/// Pull the innermost `file line:column` frame out of dart-sass stderr.
///
/// dart-sass prints the failing frame first:
///
/// ```text
/// Error: Undefined variable.
///   ╷
/// 3 │   color: $accent;
///   │          ^^^^^^^
///   ╵
///   styles/_theme.scss 3:10  @use
///   styles/app.scss 1:1      root stylesheet
/// ```
fn parse_diagnostic(stderr: &str) -> SassDiagnostic {
    static LOCATION: OnceLock<Regex> = OnceLock::new();
    let location = LOCATION
        .get_or_init(|| Regex::new(r"(?m)^\s*(.+?)\s+(\d+):(\d+)(?:\s|$)").expect("valid regex"));

    let formatted = stderr.trim().to_string();
    let Some(frame) = location.captures(stderr) else {
        return SassDiagnostic {
            file: None,
            line: None,
            column: None,
            formatted,
        };
    };

    SassDiagnostic {
        file: Some(PathBuf::from(&frame[1])),
        line: frame[2].parse().ok(),
        column: frame[3].parse().ok(),
        formatted,
    }
}
