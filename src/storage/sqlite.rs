//! SQLite store implementation

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use super::schema;
use crate::book::{Book, BookDraft};
use crate::{Error, Result};

/// SQLite-backed store for the book inventory.
///
/// A `BookStore` owns a single connection and is meant to be opened per
/// operation and dropped at the end of it: request handlers and CLI
/// commands each take their own handle instead of sharing one.
pub struct BookStore {
    conn: Connection,
}

impl BookStore {
    /// Open a database file (creates if doesn't exist).
    ///
    /// Runs an integrity check first; a corrupt file is renamed aside to
    /// `<path>.corrupt-<unix-seconds>` and a fresh, empty store takes its
    /// place. The schema is ensured on every open.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let conn = if integrity_ok(&conn) {
            conn
        } else {
            drop(conn);
            let quarantined = quarantine_corrupt(path)?;
            tracing::error!(
                "integrity check failed for {}; corrupt file moved to {}",
                path.display(),
                quarantined.display()
            );
            Connection::open(path)?
        };
        let store = Self { conn };
        store.configure()?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.configure()?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Set per-connection pragmas.
    ///
    /// `case_sensitive_like` makes LIKE a case-sensitive substring match;
    /// SQLite's default folds ASCII case.
    fn configure(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;
        Ok(())
    }

    /// Initialize the database schema (idempotent)
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Begin a transaction spanning several inserts (used by bulk import)
    pub fn transaction(&mut self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    // ========== Repository Operations ==========

    /// All books, ordered by id; no pagination
    pub fn list_all(&self) -> Result<Vec<Book>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, author, isbn, quantity, room, shelf, section FROM books ORDER BY id",
        )?;

        let books = stmt
            .query_map([], row_to_book)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(books)
    }

    /// Insert a new book and return the stored record.
    ///
    /// Fails with [`Error::Constraint`] when the draft is missing a
    /// required field or the ISBN already exists; prior state is
    /// unchanged in either case.
    pub fn create(&self, draft: &BookDraft) -> Result<Book> {
        let id = insert_book(&self.conn, draft)?;
        Ok(Book {
            id,
            title: draft.title.clone(),
            author: draft.author.clone(),
            isbn: draft.isbn.clone(),
            quantity: draft.quantity,
            room: draft.room.clone(),
            shelf: draft.shelf.clone(),
            section: draft.section.clone(),
        })
    }

    /// Get a book by id
    pub fn get(&self, id: i64) -> Result<Option<Book>> {
        self.conn
            .query_row(
                "SELECT id, title, author, isbn, quantity, room, shelf, section FROM books WHERE id = ?1",
                [id],
                row_to_book,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Overwrite all mutable fields of an existing book.
    ///
    /// Fails with [`Error::NotFound`] when the id is absent and
    /// [`Error::Constraint`] when the new ISBN collides with another
    /// record.
    pub fn update(&self, id: i64, draft: &BookDraft) -> Result<()> {
        draft.validate()?;
        let changed = self
            .conn
            .execute(
                r#"
                UPDATE books SET title = ?1, author = ?2, isbn = ?3, quantity = ?4,
                                 room = ?5, shelf = ?6, section = ?7
                WHERE id = ?8
                "#,
                params![
                    draft.title,
                    draft.author,
                    draft.isbn,
                    draft.quantity,
                    draft.room,
                    draft.shelf,
                    draft.section,
                    id,
                ],
            )
            .map_err(map_constraint)?;

        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    /// Delete a book; deleting an absent id is not an error
    pub fn delete(&self, id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM books WHERE id = ?1", [id])?;
        Ok(())
    }

    // ========== Search ==========

    /// Books whose title, author, or ISBN contains `query` as a
    /// case-sensitive substring; the empty query matches everything.
    pub fn search(&self, query: &str) -> Result<Vec<Book>> {
        let pattern = format!("%{}%", escape_like(query));

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, title, author, isbn, quantity, room, shelf, section FROM books
            WHERE title LIKE ?1 ESCAPE '\' OR author LIKE ?1 ESCAPE '\' OR isbn LIKE ?1 ESCAPE '\'
            ORDER BY id
            "#,
        )?;

        let books = stmt
            .query_map([&pattern], row_to_book)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(books)
    }

    // ========== Stats ==========

    /// Count all book records
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get inventory statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let copies: Option<i64> =
            self.conn
                .query_row("SELECT SUM(quantity) FROM books", [], |row| row.get(0))?;
        Ok(StoreStats {
            books: self.count()?,
            copies: copies.unwrap_or(0),
        })
    }
}

/// Inventory statistics
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StoreStats {
    /// Distinct book records
    pub books: usize,
    /// Total physical copies (sum of quantities)
    pub copies: i64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} titles, {} copies", self.books, self.copies)
    }
}

/// Insert a draft into `books`; shared by [`BookStore::create`] and the
/// importer's transaction-scoped inserts (`Transaction` derefs to
/// `Connection`).
pub(crate) fn insert_book(conn: &Connection, draft: &BookDraft) -> Result<i64> {
    draft.validate()?;
    conn.execute(
        r#"
        INSERT INTO books (title, author, isbn, quantity, room, shelf, section)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            draft.title,
            draft.author,
            draft.isbn,
            draft.quantity,
            draft.room,
            draft.shelf,
            draft.section,
        ],
    )
    .map_err(map_constraint)?;
    Ok(conn.last_insert_rowid())
}

/// Helper to convert a row to a Book
fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        isbn: row.get(3)?,
        quantity: row.get(4)?,
        room: row.get(5)?,
        shelf: row.get(6)?,
        section: row.get(7)?,
    })
}

/// Map SQLite constraint failures (UNIQUE, NOT NULL) to [`Error::Constraint`]
fn map_constraint(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Constraint(
                msg.clone()
                    .unwrap_or_else(|| "constraint violation".to_string()),
            )
        }
        _ => Error::Storage(err),
    }
}

/// Escape LIKE wildcards so the query string is matched literally
fn escape_like(query: &str) -> String {
    query
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_")
}

/// `PRAGMA integrity_check` must return a single `ok` row; a check that
/// itself errors (e.g. "file is not a database") also counts as corrupt.
fn integrity_ok(conn: &Connection) -> bool {
    conn.query_row("PRAGMA integrity_check", [], |row| row.get::<_, String>(0))
        .map(|verdict| verdict == "ok")
        .unwrap_or(false)
}

/// Rename a corrupt store file aside, preserving its contents for manual
/// inspection, and return the quarantine path.
fn quarantine_corrupt(path: &Path) -> Result<PathBuf> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let quarantined = PathBuf::from(format!("{}.corrupt-{}", path.display(), stamp));
    std::fs::rename(path, &quarantined)?;
    Ok(quarantined)
}
