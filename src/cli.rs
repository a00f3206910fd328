use clap::{Args, Parser, Subcommand};

use grz_watchdog_state::state::{JournalMode, SyncMode};
use grz_watchdog_state::State;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "grz-watchdog-state",
    about = "Inspect and update the processing state of grz-watchdog objects"
)]
pub struct Cli {
    /// Path to the state database (created if missing)
    #[arg(
        long,
        env = "GRZ_WATCHDOG_DB",
        default_value = "~/.grz-watchdog/metadata.db"
    )]
    pub db: String,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Milliseconds to wait for another process holding the database lock
    #[arg(long, default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// SQLite journal mode
    #[arg(long, value_enum, default_value = "wal")]
    pub journal_mode: JournalMode,

    /// SQLite synchronous level
    #[arg(long, value_enum, default_value = "normal")]
    pub synchronous: SyncMode,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the state of one object, or "absent"
    Get(ObjectArgs),
    /// Record the state of one object
    Set(SetArgs),
    /// List every object in a bucket
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ObjectArgs {
    /// Bucket the object lives in
    #[arg(value_parser = non_empty)]
    pub bucket: String,

    /// Object key within the bucket
    #[arg(value_parser = non_empty)]
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub object: ObjectArgs,

    /// New state
    #[arg(value_enum)]
    pub state: State,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Bucket to list
    #[arg(value_parser = non_empty)]
    pub bucket: String,

    /// Print records as a JSON array
    #[arg(long)]
    pub json: bool,
}

fn non_empty(s: &str) -> Result<String, String> {
    if s.is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}
