//! Types for the state tracking module.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// Processing state of a tracked object.
///
/// This is a labeling vocabulary, not an automaton: any state may replace any
/// other. Only the value domain is checked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum State {
    New,
    Seen,
    Missing,
    Running,
    Finished,
}

impl State {
    /// Every state, in declaration order.
    pub const ALL: [State; 5] = [
        State::New,
        State::Seen,
        State::Missing,
        State::Running,
        State::Finished,
    ];

    /// Convert to the string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Seen => "seen",
            Self::Missing => "missing",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "seen" => Ok(Self::Seen),
            "missing" => Ok(Self::Missing),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            other => Err(StoreError::InvalidState(other.to_string())),
        }
    }
}

impl ToSql for State {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for State {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A record of an object's state in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Store-assigned row id. Not meaningful outside the store.
    pub id: i64,
    /// Namespace the key lives in (e.g. a storage bucket name).
    pub bucket: String,
    /// Object identifier, unique within its bucket.
    pub key: String,
    /// Current processing state.
    pub state: State,
}

impl MetadataRecord {
    /// Map a `SELECT id, bucket, key, state` row.
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            bucket: row.get(1)?,
            key: row.get(2)?,
            state: row.get(3)?,
        })
    }
}
