use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundtrend::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long = "config", global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration and data directories
    Setup {
        /// Write the configuration here instead of the default location
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Download price tables for every configured symbol
    Fetch,
    /// Fit trends and compare the two fund groups
    Compare {
        /// Use previously downloaded tables instead of fetching
        #[arg(long)]
        offline: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup { path }) => {
            fundtrend::cli::setup::setup(path, cli.config_path.as_deref())
        }
        Some(Commands::Fetch) => {
            fundtrend::run_command(fundtrend::AppCommand::Fetch, cli.config_path.as_deref()).await
        }
        Some(Commands::Compare { offline, json }) => {
            fundtrend::run_command(
                fundtrend::AppCommand::Compare { offline, json },
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
