//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Sass compile-and-watch tool
#[derive(Parser)]
#[command(
    name = "sasswatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Compile SASS/SCSS to CSS with dart-sass and keep directories under watch",
    long_about = "Compile stylesheets through an external dart-sass compiler, watch project \
                  directories for changes, and keep the watched set persisted in project settings.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true, env = "SASSWATCH_SETTINGS")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .sasswatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Compile one stylesheet
    #[command(
        about = "Compile a single SASS/SCSS file to CSS",
        after_help = "Examples:\n  sasswatch compile styles/app.scss\n  sasswatch compile styles/app.scss --json"
    )]
    Compile {
        /// Stylesheet to compile
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch directories and recompile on change
    #[command(
        about = "Watch directories and recompile stylesheets on change",
        long_about = "Start a watch for every persisted watch directory plus any extra \
                      directories given here, then keep running until interrupted. Edits to \
                      watch_directories in settings.toml are picked up while the session runs.",
        after_help = "Examples:\n  sasswatch watch\n  sasswatch watch styles web/scss\n  sasswatch add-dir styles    # from another terminal; the session follows"
    )]
    Watch {
        /// Additional directories to watch for this session
        #[arg(value_name = "DIR")]
        dirs: Vec<PathBuf>,
    },

    /// Add a directory to the persisted watch list
    #[command(about = "Add a directory to the watch list")]
    AddDir {
        /// Path to directory to add
        path: PathBuf,
    },

    /// Remove a directory from the persisted watch list
    #[command(about = "Remove a directory from the watch list")]
    RemoveDir {
        /// Path to directory to remove
        path: PathBuf,
    },

    /// List all watch directories
    #[command(about = "List all directories in the watch list")]
    ListDirs,

    /// Remove every directory from the persisted watch list
    #[command(about = "Clear the watch list")]
    ClearDirs,

    /// Show current configuration settings
    #[command(about = "Display active settings from .sasswatch/settings.toml")]
    Config,

    /// Show version information
    #[command(about = "Show sasswatch and dart-sass versions")]
    Version,
}
