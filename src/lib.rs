pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

/// Commands that run against a loaded configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Download every configured symbol.
    Fetch,
    /// Run the slope comparison.
    Compare { offline: bool, json: bool },
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fundtrend starting...");

    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let store = store::SeriesStore::new(config.data_dir()?);
    let fetcher = providers::HttpCsvFetcher::new(config.source.clone(), store.clone())?;

    match command {
        AppCommand::Fetch => cli::fetch::run(&config, &fetcher).await,
        AppCommand::Compare { offline, json } => {
            cli::compare::run(&config, &fetcher, &store, offline, json).await
        }
    }
}
