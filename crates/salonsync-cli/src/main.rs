//! salonsync CLI - offline-first appointment book for the terminal
//!
//! Every command works against the local copy; changes made while the salon
//! backend is unreachable are queued and pushed by `sync` or `watch`.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::cache::run_cache;
use crate::commands::common::resolve_config_path;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::pending::run_pending;
use crate::commands::resolve::run_resolve;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
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
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("salonsync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config_file);
    let db_path = cli.db_path;

    match cli.command {
        Commands::Add(args) => run_add(&args, &config_path, db_path).await,
        Commands::Edit(args) => run_edit(&args, &config_path, db_path).await,
        Commands::List { json } => run_list(json, &config_path, db_path).await,
        Commands::Pending { json } => run_pending(json, &config_path, db_path).await,
        Commands::Sync { force, json } => run_sync(force, json, &config_path, db_path).await,
        Commands::Status { json } => run_status(json, &config_path, db_path).await,
        Commands::Resolve { id, keep } => run_resolve(&id, keep, &config_path, db_path).await,
        Commands::Watch => run_watch(&config_path, db_path).await,
        Commands::Cache { command } => run_cache(&command, &config_path, db_path).await,
        Commands::Config { command } => run_config(command, &config_path),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
    }
}
