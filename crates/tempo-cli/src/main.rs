//! Tempo CLI - Offline-first time tracking from the terminal
//!
//! Every command works without a network; sync drains the outbox when a
//! remote is configured and a session is active.

mod cli;
mod commands;
mod error;
mod session;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tempo=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path)?;

    match cli.command {
        Commands::Slot { command } => commands::slot::run(command, &db_path).await?,
        Commands::Tag { command } => commands::tag::run(command, &db_path).await?,
        Commands::Domain { command } => commands::domain::run(command, &db_path).await?,
        Commands::Log { command } => commands::log::run(command, &db_path).await?,
        Commands::Sync { command } => commands::sync::run(command, &db_path).await?,
        Commands::Outbox { failed, limit, json } => {
            commands::outbox::run(failed, limit, json, &db_path).await?;
        }
        Commands::Login { owner_id } => commands::auth::run_login(&owner_id, &db_path).await?,
        Commands::Logout => commands::auth::run_logout(&db_path).await?,
    }

    Ok(())
}
