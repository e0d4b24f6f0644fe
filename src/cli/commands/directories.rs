//! Watch list management commands (add-dir, remove-dir, list-dirs, clear-dirs).
//!
//! These edit the persisted `watch_directories` list in settings.toml. A
//! running `sasswatch watch` session picks the change up on its own, so
//! they double as a remote control for a session in another terminal.
//! Entries are compared after resolution against the project root, since
//! the session stores absolute paths while hand-edited files may hold
//! relative ones.

use std::path::{Path, PathBuf};

use crate::config::{CONFIG_DIR, Settings};
use crate::paths;

/// Add a directory to the persisted watch list.
///
/// The directory is resolved against the project root and stored in
/// resolved form, the same shape the watch session itself persists.
/// Returns the updated settings and whether the directory was newly added.
/// Adding a directory that is already listed under any spelling is a
/// no-op, mirroring how watching an already-watched directory behaves.
pub fn add_directory_to_settings(
    directory: &Path,
    config_path: &Path,
) -> Result<(Settings, bool), String> {
    let mut settings = Settings::load_from(config_path)
        .map_err(|e| format!("Error loading configuration: {e}"))?;

    let root = project_root_for(&settings, config_path);
    let resolved = paths::resolve(&root, directory);

    if settings
        .compiler
        .watch_directories
        .iter()
        .any(|existing| paths::resolve(&root, existing) == resolved)
    {
        return Ok((settings, false));
    }

    settings.compiler.watch_directories.push(resolved);
    settings
        .save(config_path)
        .map_err(|e| format!("Error saving configuration: {e}"))?;

    Ok((settings, true))
}

/// Remove a directory from the persisted watch list, under whichever
/// spelling it was stored.
///
/// Returns the updated settings and whether anything was removed.
pub fn remove_directory_from_settings(
    directory: &Path,
    config_path: &Path,
) -> Result<(Settings, bool), String> {
    let mut settings = Settings::load_from(config_path)
        .map_err(|e| format!("Error loading configuration: {e}"))?;

    let root = project_root_for(&settings, config_path);
    let resolved = paths::resolve(&root, directory);

    let before = settings.compiler.watch_directories.len();
    settings
        .compiler
        .watch_directories
        .retain(|existing| paths::resolve(&root, existing) != resolved);
    let removed = settings.compiler.watch_directories.len() != before;

    if removed {
        settings
            .save(config_path)
            .map_err(|e| format!("Error saving configuration: {e}"))?;
    }

    Ok((settings, removed))
}

/// Empty the persisted watch list, returning how many entries it had.
pub fn clear_directories_in_settings(config_path: &Path) -> Result<usize, String> {
    let mut settings = Settings::load_from(config_path)
        .map_err(|e| format!("Error loading configuration: {e}"))?;

    let cleared = settings.compiler.watch_directories.len();
    if cleared > 0 {
        settings.compiler.watch_directories.clear();
        settings
            .save(config_path)
            .map_err(|e| format!("Error saving configuration: {e}"))?;
    }

    Ok(cleared)
}

/// Run add-dir command.
pub fn run_add_dir(directory: PathBuf, cli_config: Option<&Path>) {
    let config_path = resolve_config_path(cli_config);

    match add_directory_to_settings(&directory, &config_path) {
        Ok((settings, true)) => {
            println!("Added directory to watch list: {}", directory.display());
            println!("Configuration saved to: {}", config_path.display());
            print_watch_directories(&settings);
        }
        Ok((settings, false)) => {
            println!("Directory already in watch list: {}", directory.display());
            print_watch_directories(&settings);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Run remove-dir command.
pub fn run_remove_dir(directory: PathBuf, cli_config: Option<&Path>) {
    let config_path = resolve_config_path(cli_config);

    match remove_directory_from_settings(&directory, &config_path) {
        Ok((settings, true)) => {
            println!("Removed directory from watch list: {}", directory.display());
            println!("Configuration saved to: {}", config_path.display());
            print_watch_directories(&settings);
        }
        Ok((_, false)) => {
            // Same shape as unwatching a directory that was never watched
            eprintln!(
                "Warning: Directory not in watch list: {}",
                directory.display()
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Run list-dirs command.
pub fn run_list_dirs(config: &Settings) {
    println!("Watch directories:");
    if config.compiler.watch_directories.is_empty() {
        println!("  (none configured)");
        println!("\nTo add directories: sasswatch add-dir <path>");
    } else {
        for directory in &config.compiler.watch_directories {
            println!("  - {}", directory.display());
        }
    }
}

/// Run clear-dirs command.
pub fn run_clear_dirs(cli_config: Option<&Path>) {
    let config_path = resolve_config_path(cli_config);

    match clear_directories_in_settings(&config_path) {
        Ok(0) => println!("No watch directories configured."),
        Ok(cleared) => {
            println!("Cleared {cleared} watch directories");
            println!("Configuration saved to: {}", config_path.display());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_watch_directories(settings: &Settings) {
    if settings.compiler.watch_directories.is_empty() {
        println!("\nNo watch directories configured.");
    } else {
        println!("\nCurrent watch directories:");
        for directory in &settings.compiler.watch_directories {
            println!("  - {}", directory.display());
        }
    }
}

fn resolve_config_path(cli_config: Option<&Path>) -> PathBuf {
    if let Some(custom_path) = cli_config {
        custom_path.to_path_buf()
    } else {
        Settings::find_workspace_config().unwrap_or_else(|| {
            eprintln!("Error: No configuration file found. Run 'sasswatch init' first.");
            std::process::exit(1);
        })
    }
}

/// The root `watch_directories` entries resolve against: the recorded
/// workspace root when the settings carry one, otherwise derived from the
/// settings file location (`<root>/.sasswatch/settings.toml`, or the
/// directory holding an explicitly named config file).
fn project_root_for(settings: &Settings, config_path: &Path) -> PathBuf {
    if let Some(root) = &settings.workspace_root {
        return root.clone();
    }

    let parent = config_path.parent().unwrap_or(Path::new("."));
    if parent.file_name().is_some_and(|name| name == CONFIG_DIR) {
        parent.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}
