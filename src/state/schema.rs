//! Database schema definitions and migrations.

use rusqlite::{Connection, TransactionBehavior};

use super::error::StoreError;

/// Current schema version. Increment when making schema changes.
pub const SCHEMA_VERSION: i32 = 1;

/// Table name shared with database files written by earlier grz-watchdog releases.
pub const TABLE: &str = "metadatarecord";

/// Columns every usable `metadatarecord` table must carry.
const REQUIRED_COLUMNS: [&str; 4] = ["id", "bucket", "key", "state"];

/// Schema DDL for version 1.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS metadatarecord (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bucket TEXT NOT NULL,
    key TEXT NOT NULL,
    state TEXT NOT NULL
        CHECK (state IN ('new', 'seen', 'missing', 'running', 'finished'))
);
"#;

/// (bucket, key) uniqueness. Applied separately so legacy tables can be
/// deduplicated first.
const INDEX_V1: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_metadatarecord_bucket_key
    ON metadatarecord(bucket, key);
"#;

/// Get the current schema version from the database.
pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32, StoreError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(StoreError::Schema)
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StoreError> {
    conn.pragma_update(None, "user_version", version)
        .map_err(StoreError::Schema)
}

/// Initialize or migrate the database schema.
///
/// Idempotent and safe to call on new, current and legacy databases. Runs in a
/// single immediate transaction, so a failed migration leaves the file as it was.
pub(crate) fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StoreError::Schema)?;

    let current_version = get_schema_version(&tx)?;

    if current_version > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchemaVersion {
            found: current_version,
            expected: SCHEMA_VERSION,
        });
    }

    if current_version == SCHEMA_VERSION {
        check_columns(&tx)?;
        return Ok(());
    }

    if table_exists(&tx)? {
        // Unversioned table from an earlier release: no uniqueness was enforced.
        check_columns(&tx)?;
        collapse_duplicates(&tx)?;
        tx.execute_batch(INDEX_V1).map_err(StoreError::Schema)?;
        tracing::info!(
            "Migrated legacy {} table to schema version {}",
            TABLE,
            SCHEMA_VERSION
        );
    } else {
        tx.execute_batch(SCHEMA_V1).map_err(StoreError::Schema)?;
        tx.execute_batch(INDEX_V1).map_err(StoreError::Schema)?;
        tracing::info!("Initialized database schema at version {}", SCHEMA_VERSION);
    }

    set_schema_version(&tx, SCHEMA_VERSION)?;
    tx.commit().map_err(StoreError::Schema)?;
    Ok(())
}

fn table_exists(conn: &Connection) -> Result<bool, StoreError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [TABLE],
            |row| row.get(0),
        )
        .map_err(StoreError::Schema)?;
    Ok(count > 0)
}

/// Reject a `metadatarecord` table that is missing any required column.
fn check_columns(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .map_err(StoreError::Schema)?;
    let columns = stmt
        .query_map([TABLE], |row| row.get::<_, String>(0))
        .map_err(StoreError::Schema)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::Schema)?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !columns.iter().any(|c| c == required))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::IncompatibleSchema(format!(
            "table {} is missing column(s): {}",
            TABLE,
            missing.join(", ")
        )))
    }
}

/// Keep only the lowest-id row per (bucket, key), which is the row lookups
/// already returned before the unique index existed.
fn collapse_duplicates(conn: &Connection) -> Result<(), StoreError> {
    let removed = conn
        .execute(
            "DELETE FROM metadatarecord WHERE id NOT IN \
             (SELECT MIN(id) FROM metadatarecord GROUP BY bucket, key)",
            [],
        )
        .map_err(StoreError::Schema)?;
    if removed > 0 {
        tracing::warn!(
            removed,
            "Removed duplicate (bucket, key) rows while migrating legacy store"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Table layout written by the first grz-watchdog releases.
    const LEGACY_TABLE: &str = r#"
    CREATE TABLE metadatarecord (
        id INTEGER NOT NULL,
        bucket VARCHAR NOT NULL,
        key VARCHAR NOT NULL,
        state VARCHAR NOT NULL,
        PRIMARY KEY (id)
    );
    "#;

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_fresh_db_migration() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_idempotent_migration() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_unsupported_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        let result = migrate(&mut conn);
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedSchemaVersion { .. })
        ));
    }

    #[test]
    fn test_tables_and_index_created() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM metadatarecord"), 0);
        assert_eq!(
            count(
                &conn,
                "SELECT COUNT(*) FROM sqlite_master \
                 WHERE type = 'index' AND name = 'idx_metadatarecord_bucket_key'"
            ),
            1
        );
    }

    #[test]
    fn test_unique_index_rejects_duplicate_pair() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO metadatarecord (bucket, key, state) VALUES ('b', 'k', 'new')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO metadatarecord (bucket, key, state) VALUES ('b', 'k', 'seen')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_check_constraint_rejects_unknown_state() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        let result = conn.execute(
            "INSERT INTO metadatarecord (bucket, key, state) VALUES ('b', 'k', 'paused')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_table_duplicates_collapsed_to_lowest_id() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_TABLE).unwrap();
        conn.execute_batch(
            "INSERT INTO metadatarecord (bucket, key, state) VALUES ('grz-1', 'a', 'new');
             INSERT INTO metadatarecord (bucket, key, state) VALUES ('grz-1', 'a', 'running');
             INSERT INTO metadatarecord (bucket, key, state) VALUES ('grz-1', 'b', 'seen');",
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM metadatarecord"), 2);
        let state: String = conn
            .query_row(
                "SELECT state FROM metadatarecord WHERE bucket = 'grz-1' AND key = 'a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(state, "new");
    }

    #[test]
    fn test_legacy_table_missing_column_is_incompatible() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE metadatarecord (id INTEGER PRIMARY KEY, bucket TEXT);")
            .unwrap();
        let err = migrate(&mut conn).unwrap_err();
        assert!(matches!(err, StoreError::IncompatibleSchema(ref msg) if msg.contains("key")));
        // Nothing was committed.
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
    }
}
