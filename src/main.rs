//! grz-watchdog-state: command-line access to the grz-watchdog state store.
//!
//! Reads and writes the processing state of (bucket, key) objects in the same
//! SQLite database the watchdog uses.

#![warn(clippy::all)]

mod cli;
mod config;
mod types;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use grz_watchdog_state::{MetadataStore, SqliteMetadataStore};

use cli::Command;
use config::Config;

fn open_store(config: &Config) -> anyhow::Result<SqliteMetadataStore> {
    SqliteMetadataStore::open_with_options(&config.db_path, &config.store_options)
        .with_context(|| format!("Failed to open state database {}", config.db_path.display()))
}

/// Run the get command.
fn run_get(store: &dyn MetadataStore, args: cli::ObjectArgs) -> anyhow::Result<()> {
    let state = store
        .get_state(&args.bucket, &args.key)
        .with_context(|| format!("Failed to read {}/{}", args.bucket, args.key))?;
    match state {
        Some(state) => println!("{}", state),
        None => println!("absent"),
    }
    Ok(())
}

/// Run the set command.
fn run_set(store: &dyn MetadataStore, args: cli::SetArgs) -> anyhow::Result<()> {
    store
        .update_state(&args.object.bucket, &args.object.key, args.state)
        .with_context(|| {
            format!(
                "Failed to set {}/{} to {}",
                args.object.bucket, args.object.key, args.state
            )
        })?;
    tracing::info!(
        bucket = %args.object.bucket,
        key = %args.object.key,
        state = %args.state,
        "State recorded"
    );
    Ok(())
}

/// Run the list command.
fn run_list(store: &dyn MetadataStore, args: cli::ListArgs) -> anyhow::Result<()> {
    let records = store
        .records(&args.bucket)
        .with_context(|| format!("Failed to list {}", args.bucket))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in &records {
        println!("{}\t{}", record.key, record.state);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(&cli);
    tracing::debug!(?config, "Resolved configuration");

    let store = open_store(&config)?;

    match cli.command {
        Command::Get(args) => run_get(&store, args),
        Command::Set(args) => run_set(&store, args),
        Command::List(args) => run_list(&store, args),
    }
}
