//! Metadata store trait and SQLite implementation.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use super::error::StoreError;
use super::schema;
use super::types::{MetadataRecord, State};

/// Durable mapping from (bucket, key) to a current [`State`].
///
/// All methods block. Each call runs in its own transaction, which is
/// committed before returning or rolled back on failure. This trait is
/// object-safe, so it can be shared as `Arc<dyn MetadataStore>`.
pub trait MetadataStore: Send + Sync {
    /// Look up the state of a single object.
    ///
    /// Returns `Ok(None)` for objects that were never recorded.
    fn get_state(&self, bucket: &str, key: &str) -> Result<Option<State>, StoreError>;

    /// Record `state` for an object, inserting it on first sight.
    ///
    /// Any state may replace any other; no transition rules are applied.
    fn update_state(&self, bucket: &str, key: &str, state: State) -> Result<(), StoreError>;

    /// All records in `bucket`, in insertion order.
    fn records(&self, bucket: &str) -> Result<Vec<MetadataRecord>, StoreError>;
}

/// SQLite `journal_mode` applied on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

/// SQLite `synchronous` level applied on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SyncMode {
    #[default]
    Normal,
    Full,
}

impl SyncMode {
    fn pragma_value(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
        }
    }
}

/// Connection settings for [`SqliteMetadataStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub journal_mode: JournalMode,
    pub sync_mode: SyncMode,
    /// How long SQLite waits on another connection's lock before failing.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            journal_mode: JournalMode::Wal,
            sync_mode: SyncMode::Normal,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite implementation of the metadata store.
pub struct SqliteMetadataStore {
    /// Wrapped in Mutex because rusqlite::Connection is not Sync.
    conn: Mutex<Connection>,
    /// Path to the database file (for error messages).
    path: PathBuf,
}

impl std::fmt::Debug for SqliteMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMetadataStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteMetadataStore {
    /// Open or create a store at the given path with default options.
    ///
    /// Missing parent directories are created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_options(path, &StoreOptions::default())
    }

    /// Open or create a store at the given path.
    pub fn open_with_options(path: &Path, options: &StoreOptions) -> Result<Self, StoreError> {
        ensure_parent_dir(path)?;

        let mut conn = Connection::open(path).map_err(|e| StoreError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        apply_pragmas(&conn, options)?;
        schema::migrate(&mut conn)?;

        tracing::debug!(path = %path.display(), "Opened metadata store");

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Get the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn get_state(&self, bucket: &str, key: &str) -> Result<Option<State>, StoreError> {
        tracing::debug!(bucket, key, "Getting state");

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::Read)?;

        // Lowest id wins should a pre-migration duplicate ever surface.
        let state = tx
            .prepare_cached(
                "SELECT state FROM metadatarecord WHERE bucket = ?1 AND key = ?2 ORDER BY id LIMIT 1",
            )
            .and_then(|mut stmt| {
                stmt.query_row([bucket, key], |row| row.get::<_, State>(0))
                    .optional()
            })
            .map_err(StoreError::Read)?;

        tx.commit().map_err(StoreError::Read)?;
        Ok(state)
    }

    fn update_state(&self, bucket: &str, key: &str, state: State) -> Result<(), StoreError> {
        tracing::debug!(bucket, key, %state, "Updating state");

        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock up front so concurrent writers queue
        // on the busy timeout instead of failing mid-transaction.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::Write)?;

        tx.prepare_cached(
            r#"
            INSERT INTO metadatarecord (bucket, key, state)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(bucket, key) DO UPDATE SET state = excluded.state
            "#,
        )
        .and_then(|mut stmt| stmt.execute(rusqlite::params![bucket, key, state]))
        .map_err(StoreError::Write)?;

        tx.commit().map_err(StoreError::Write)?;
        Ok(())
    }

    fn records(&self, bucket: &str) -> Result<Vec<MetadataRecord>, StoreError> {
        tracing::debug!(bucket, "Getting records");

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::Read)?;

        let mut stmt = tx
            .prepare_cached(
                "SELECT id, bucket, key, state FROM metadatarecord WHERE bucket = ?1 ORDER BY id",
            )
            .map_err(StoreError::Read)?;
        let records = stmt
            .query_map([bucket], MetadataRecord::from_row)
            .map_err(StoreError::Read)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Read)?;
        drop(stmt);

        tx.commit().map_err(StoreError::Read)?;
        Ok(records)
    }
}

/// Create the directory that will hold the database file.
fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

/// Apply connection pragmas. A file that is not an SQLite database fails here.
fn apply_pragmas(conn: &Connection, options: &StoreOptions) -> Result<(), StoreError> {
    conn.busy_timeout(options.busy_timeout)
        .map_err(StoreError::Schema)?;

    // journal_mode reports the resulting mode as a row
    conn.pragma_update_and_check(
        None,
        "journal_mode",
        options.journal_mode.pragma_value(),
        |row| row.get::<_, String>(0),
    )
    .map_err(StoreError::Schema)?;

    conn.pragma_update(None, "synchronous", options.sync_mode.pragma_value())
        .map_err(StoreError::Schema)?;
    Ok(())
}
