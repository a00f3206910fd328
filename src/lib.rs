//! grz-watchdog-state: persistent processing state for objects in buckets.
//!
//! Objects are identified by a (bucket, key) pair and carry one [`State`]
//! each. [`SqliteMetadataStore`] keeps them in a single SQLite table, creating
//! the file and its parent directory on first open.
//!
//! ```no_run
//! use grz_watchdog_state::{MetadataStore, SqliteMetadataStore, State};
//!
//! # fn main() -> Result<(), grz_watchdog_state::StoreError> {
//! let store = SqliteMetadataStore::open("/var/lib/grz-watchdog/metadata.db".as_ref())?;
//! store.update_state("grz-1", "sample-42", State::New)?;
//! assert_eq!(store.get_state("grz-1", "sample-42")?, Some(State::New));
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod state;

pub use state::{
    ErrorKind, MetadataRecord, MetadataStore, SqliteMetadataStore, State, StoreError, StoreOptions,
};
