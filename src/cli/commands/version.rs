//! Version command: report tool and compiler versions.

use crate::compiler::{Compiler, DartSassCompiler};
use crate::config::Settings;

/// Run version command - show sasswatch and dart-sass versions.
pub async fn run_version(config: &Settings) {
    println!("sasswatch {}", env!("CARGO_PKG_VERSION"));

    let compiler = DartSassCompiler::from_config(&config.compiler);
    match compiler.version().await {
        Ok(version) => println!("Uses dart-sass compiler: {version}"),
        Err(e) => eprintln!("Warning: could not determine sass version: {e}"),
    }
}
