//! UPISensei CLI - Bank statement extraction and spending chat
//!
//! Usage:
//!   upisensei serve --port 3000          Start web server
//!   upisensei extract statement.pdf      Extract transactions from a statement
//!   upisensei categorize "SWIGGY ORDER"  Show category and merchant for a description
//!   upisensei config show                Print the resolved configuration

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
            no_seed,
            cors_origin,
        } => {
            commands::cmd_serve(
                config,
                host,
                port,
                static_dir,
                no_seed,
                cors_origin,
            )
            .await
        }
        Commands::Extract { file, json, today } => {
            commands::cmd_extract(&config, &file, json, today).await
        }
        Commands::Categorize { description } => {
            commands::cmd_categorize(&description);
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                commands::cmd_config_show(&config);
                Ok(())
            }
            ConfigAction::Path => {
                commands::cmd_config_path(cli.config.as_deref());
                Ok(())
            }
        },
    }
}
