//! One-shot compile command.

use std::path::PathBuf;

use crate::compiler::{CompileContext, Compiler, DartSassCompiler, failure_message, is_partial};
use crate::config::Settings;
use crate::paths;
use crate::project::{ProjectLocator, WorkspaceLocator};

/// Run compile command - compile a single stylesheet.
///
/// The file is resolved against the project that owns it; outside any
/// project the current directory stands in as the root.
pub async fn run_compile(file: PathBuf, json: bool, config: &Settings) {
    let locator = WorkspaceLocator::discover();
    let root = locator
        .project_root_for(&file)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let input = paths::resolve(&root, &file);
    if is_partial(&input) {
        eprintln!(
            "Error: {} is a partial; partials are only compiled through the files that import them",
            input.display()
        );
        std::process::exit(1);
    }

    let compiler_config = config.compiler.resolved_against(&root);
    let context = CompileContext::from_config(&compiler_config);
    let compiler = DartSassCompiler::from_config(&compiler_config);

    match compiler.compile_file(&input, &context).await {
        Ok(output) => {
            if json {
                match serde_json::to_string_pretty(&output) {
                    Ok(payload) => println!("{payload}"),
                    Err(e) => eprintln!("Error encoding output: {e}"),
                }
            } else {
                println!(
                    "Compiled {} to {} ({}ms)",
                    input.display(),
                    output.css.display(),
                    output.elapsed_ms
                );
                if let Some(min_css) = &output.min_css {
                    println!("Compiled {} to {}", input.display(), min_css.display());
                }
            }
        }
        Err(e) => {
            eprintln!("{}", failure_message(&input, &e));
            std::process::exit(1);
        }
    }
}
