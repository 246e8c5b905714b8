mod commands;
mod config;
mod observability;

use clap::{Parser, Subcommand};
use config::{Config, LoggingConfig};
use resolver::routes::RouteTable;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "newsroute", about = "Resolve news article URLs to their canonical form")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Print the normalized form and fetch candidates of a slug
    Normalize { raw: String },
    /// Show how a path is matched and classified, without network access
    Classify {
        path: String,
        /// Use the route patterns from this config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Resolve a path against the configured content API
    Resolve {
        path: String,
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(commands::CliError::NotFound) => ExitCode::from(2),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: CliCommand) -> Result<(), commands::CliError> {
    match command {
        CliCommand::Normalize { raw } => {
            let _guard = observability::init_logging(&LoggingConfig::default());
            commands::normalize(&raw);
            Ok(())
        }
        CliCommand::Classify { path, config } => {
            let _guard = observability::init_logging(&LoggingConfig::default());
            let routes = match config {
                Some(config) => Config::from_file(&config)?.resolver.route_table()?,
                None => RouteTable::default(),
            };
            commands::classify_path(&routes, &path)
        }
        CliCommand::Resolve { path, config } => {
            let config = Config::from_file(&config)?;
            let _guard =
                observability::init_logging(&config.logging.clone().unwrap_or_default());
            if let Some(metrics) = &config.metrics {
                observability::init_metrics(metrics)?;
            }
            commands::resolve(&config, &path).await
        }
    }
}
