//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with a single table:
//! - books(id, title, author, isbn, quantity, room, shelf, section)
//!
//! Every caller opens its own [`BookStore`] handle for the duration of one
//! operation; there is no shared connection state. Opening a store ensures
//! the schema exists and runs an integrity check, quarantining the file
//! and starting fresh if the check fails.

pub mod schema;
pub mod sqlite;

pub use sqlite::{BookStore, StoreStats};
