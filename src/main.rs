use clap::Parser;
use std::path::PathBuf;

use sasswatch::cli::{Cli, Commands, commands};
use sasswatch::config::{CONFIG_DIR, SETTINGS_FILE, Settings};
use sasswatch::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(Settings::find_workspace_config)
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));

    let settings = Settings::load_from(&config_path).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Compile { file, json } => {
            commands::compile::run_compile(file, json, &settings).await
        }
        Commands::Watch { dirs } => commands::watch::run_watch(dirs, &config_path, &settings).await,
        Commands::AddDir { path } => commands::directories::run_add_dir(path, cli.config.as_deref()),
        Commands::RemoveDir { path } => {
            commands::directories::run_remove_dir(path, cli.config.as_deref())
        }
        Commands::ListDirs => commands::directories::run_list_dirs(&settings),
        Commands::ClearDirs => commands::directories::run_clear_dirs(cli.config.as_deref()),
        Commands::Version => commands::version::run_version(&settings).await,
    }
}
