//! Configuration for the sass compile-and-watch tool.
//!
//! Layered configuration in the usual order of precedence:
//! - Built-in defaults
//! - `.sasswatch/settings.toml` in the project
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `SASSWATCH_` and use double
//! underscores to separate nested levels:
//! - `SASSWATCH_COMPILER__DISABLE_MINIFIED=true` sets `compiler.disable_minified`
//! - `SASSWATCH_WATCHER__DEBOUNCE_MS=200` sets `watcher.debounce_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths;

/// Name of the per-project configuration directory.
pub const CONFIG_DIR: &str = ".sasswatch";

/// Name of the settings file inside [`CONFIG_DIR`].
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Project root directory (where .sasswatch is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Compiler options, including the persisted watch directory list
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Watch behavior tuning
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Compiler options plus the persisted watch set.
///
/// This is the snapshot handed by value into every lifecycle operation. The
/// watch lifecycle only reads `watch_directories`; the remaining fields are
/// carried through opaquely for the compiler.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompilerConfig {
    /// Directories under watch, persisted across restarts.
    ///
    /// Entries may be relative to the project root; they are resolved at the
    /// point of use, not at load time.
    #[serde(default)]
    pub watch_directories: Vec<PathBuf>,

    /// Additional load paths passed to the compiler for `@import`/`@use`.
    #[serde(default)]
    pub include_path: Vec<PathBuf>,

    /// Working directory for compiler invocations. Defaults to the project
    /// root when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sass_working_directory: Option<PathBuf>,

    /// Skip generating the additional `.min.css` artifact.
    #[serde(default = "default_false")]
    pub disable_minified: bool,

    /// The external dart-sass executable.
    #[serde(default = "default_sass_bin")]
    pub sass_bin: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// How long a changed file must stay quiet before it is compiled, in
    /// milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `sasswatch::watcher = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_false() -> bool {
    false
}
fn default_sass_bin() -> PathBuf {
    PathBuf::from("sass")
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            compiler: CompilerConfig::default(),
            watcher: WatcherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            watch_directories: Vec::new(),
            include_path: Vec::new(),
            sass_working_directory: None,
            disable_minified: false,
            sass_bin: default_sass_bin(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl CompilerConfig {
    /// Project the config onto a concrete root: include paths and the
    /// working directory become absolute, the working directory falls back
    /// to the root itself.
    ///
    /// `watch_directories` is left untouched: entries are resolved
    /// individually at the point a watch is started or stopped.
    pub fn resolved_against(&self, root: &Path) -> Self {
        let mut resolved = self.clone();
        resolved.include_path = paths::resolve_all(root, &self.include_path);
        resolved.sass_working_directory = Some(match &self.sass_working_directory {
            Some(dir) => paths::resolve(root, dir),
            None => root.to_path_buf(),
        });
        resolved
    }
}

impl Settings {
    /// Load configuration from all sources, using the workspace settings
    /// file if one can be found.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific settings file.
    ///
    /// Missing files are not an error: defaults and environment overrides
    /// still apply, which is what lets `init` and `compile` run in a fresh
    /// project.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in the settings file if it exists
            .merge(Toml::file(path))
            // Layer in environment variables with SASSWATCH_ prefix.
            // Double underscore separates nested levels.
            .merge(Env::prefixed("SASSWATCH_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Find the workspace settings file by looking for a `.sasswatch`
    /// directory, searching from the current directory up to the root.
    pub fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// Get the project root directory (where `.sasswatch` is located).
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            if ancestor.join(CONFIG_DIR).is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }

        None
    }

    /// Save the current configuration to a settings file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file under `.sasswatch/` in the current
    /// directory.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE);

        if config_path.exists() && !force {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let existed = config_path.exists();
        let mut settings = Settings::default();

        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        if existed {
            println!("Overwrote configuration at: {}", config_path.display());
        } else {
            println!("Created default configuration at: {}", config_path.display());
        }

        Ok(config_path)
    }
}
