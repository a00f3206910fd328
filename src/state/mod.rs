//! State tracking module for per-object processing state.
//!
//! This module provides SQLite-based tracking of (bucket, key) objects and the
//! state each one is in. It answers:
//! - What state is this object in?
//! - Record or advance this object's state
//! - Which objects are known in a bucket?

pub mod db;
pub mod error;
pub mod schema;
pub mod types;

pub use db::{JournalMode, MetadataStore, SqliteMetadataStore, StoreOptions, SyncMode};
pub use error::{ErrorKind, StoreError};
pub use types::{MetadataRecord, State};
