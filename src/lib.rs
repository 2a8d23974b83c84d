//! # Bookstock - Library Book Inventory Manager
//!
//! A small administrative tool for managing a library's book inventory.
//!
//! Bookstock provides:
//! - SQLite-backed record store for book records
//! - Repository operations: list, create, get, update, delete
//! - Substring search over title, author, and ISBN
//! - Bulk import from spreadsheet files with per-row fault tolerance
//! - HTTP server exposing the operations to a local admin UI

pub mod book;
pub mod config;
pub mod import;
pub mod server;
pub mod storage;

// Re-exports for convenient access
pub use book::{Book, BookDraft};
pub use import::ImportReport;
pub use storage::BookStore;

/// Result type alias for Bookstock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Bookstock operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Duplicate ISBN or a missing required field
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Referenced book id does not exist
    #[error("No book with id {0}")]
    NotFound(i64),

    /// Upload rejected before any row was read
    #[error("Import file rejected: {0}")]
    File(String),

    /// Workbook could not be opened or parsed
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
