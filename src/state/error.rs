//! Error types for the state tracking module.

use std::path::PathBuf;

use thiserror::Error;

/// Broad failure category of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The store or its directory could not be created or opened.
    StoreUnavailable,
    /// The schema could not be created or the file is incompatible.
    SchemaError,
    /// A write transaction did not commit.
    WriteFailure,
    /// A query did not execute.
    ReadFailure,
    /// A value was rejected before it reached the store.
    InvalidInput,
}

/// Errors that can occur during state store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create the directory holding the database file.
    #[error("Failed to create store directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open or create the database file.
    #[error("Failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A previous holder of the connection panicked.
    #[error("Database connection lock poisoned")]
    Poisoned,

    /// Creating or migrating the schema failed.
    #[error("Database schema initialization failed: {0}")]
    Schema(#[source] rusqlite::Error),

    /// The existing file holds a table this store cannot use.
    #[error("Incompatible database schema: {0}")]
    IncompatibleSchema(String),

    /// The database schema version is newer than supported.
    #[error("Database schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },

    /// A write transaction failed and was rolled back.
    #[error("Database write failed: {0}")]
    Write(#[source] rusqlite::Error),

    /// A query failed.
    #[error("Database query failed: {0}")]
    Read(#[source] rusqlite::Error),

    /// Not one of the known state literals.
    #[error("Invalid state {0:?}, expected one of: new, seen, missing, running, finished")]
    InvalidState(String),
}

impl StoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CreateDir { .. } | Self::Open { .. } | Self::Poisoned => {
                ErrorKind::StoreUnavailable
            }
            Self::Schema(_) | Self::IncompatibleSchema(_) | Self::UnsupportedSchemaVersion { .. } => {
                ErrorKind::SchemaError
            }
            Self::Write(_) => ErrorKind::WriteFailure,
            Self::Read(_) => ErrorKind::ReadFailure,
            Self::InvalidState(_) => ErrorKind::InvalidInput,
        }
    }
}
