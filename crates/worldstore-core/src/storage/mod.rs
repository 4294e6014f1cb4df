//! Storage Module
//!
//! SQLite-backed persistence: term codec, schema migrations, and the store
//! itself (statement table, chunk/index sync, cascading delete, world
//! registry, write-scope coordination).

mod codec;
mod migrations;
mod sqlite;

pub use migrations::{apply_migrations, get_current_version, Migration, MIGRATIONS};
pub use sqlite::{IndexIntegrityReport, Result, Store, StoreConfig, StoreError};
