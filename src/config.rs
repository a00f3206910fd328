use std::path::PathBuf;
use std::time::Duration;

use grz_watchdog_state::StoreOptions;

/// Application configuration resolved from the command line and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub store_options: StoreOptions,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        Self {
            db_path: expand_tilde(&cli.db),
            store_options: StoreOptions {
                journal_mode: cli.journal_mode,
                sync_mode: cli.synchronous,
                busy_timeout: Duration::from_millis(cli.busy_timeout_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_tilde("~/.grz-watchdog/metadata.db"),
                home.join(".grz-watchdog/metadata.db")
            );
        }
        assert_eq!(
            expand_tilde("/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            expand_tilde("relative/path"),
            PathBuf::from("relative/path")
        );
    }

    #[test]
    fn test_from_cli() {
        let cli = crate::cli::Cli::try_parse_from([
            "grz-watchdog-state",
            "--db",
            "/data/grz/metadata.db",
            "--busy-timeout-ms",
            "250",
            "--synchronous",
            "full",
            "list",
            "grz-1",
        ])
        .unwrap();
        let cfg = Config::from_cli(&cli);
        assert_eq!(cfg.db_path, PathBuf::from("/data/grz/metadata.db"));
        assert_eq!(cfg.store_options.busy_timeout, Duration::from_millis(250));
        assert_eq!(
            cfg.store_options.journal_mode,
            grz_watchdog_state::state::JournalMode::Wal
        );
        assert_eq!(
            cfg.store_options.sync_mode,
            grz_watchdog_state::state::SyncMode::Full
        );
    }
}
