//! Book records - the single entity of the inventory
//!
//! `Book` is the stored record; `BookDraft` carries the mutable fields on
//! the way in and performs field-presence validation before the store is
//! touched, so a malformed form or spreadsheet row fails as a constraint
//! violation rather than a storage error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A book record as stored in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Auto-assigned primary key; immutable for the record's lifetime
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Unique across all records
    pub isbn: String,
    pub quantity: i64,
    pub room: Option<String>,
    pub shelf: Option<String>,
    pub section: Option<String>,
}

/// The mutable fields of a book, before or instead of storage.
///
/// Construct one with [`BookDraft::new`] and check it with
/// [`BookDraft::validate`] (create/update do this for you).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub quantity: i64,
    pub room: Option<String>,
    pub shelf: Option<String>,
    pub section: Option<String>,
}

impl BookDraft {
    /// Create a new draft with the required fields; location fields start empty
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        quantity: i64,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            quantity,
            room: None,
            shelf: None,
            section: None,
        }
    }

    /// Set the optional location fields
    pub fn with_location(
        mut self,
        room: impl Into<String>,
        shelf: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        self.room = Some(room.into());
        self.shelf = Some(shelf.into());
        self.section = Some(section.into());
        self
    }

    /// Check that every required field is present.
    ///
    /// Required means non-empty after trimming: title, author, isbn.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Constraint(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

impl From<&Book> for BookDraft {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            quantity: book.quantity,
            room: book.room.clone(),
            shelf: book.shelf.clone(),
            section: book.section.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_draft() {
        let draft = BookDraft::new("Dune", "Frank Herbert", "9780441172719", 3);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_missing_required_fields() {
        let draft = BookDraft::new("", "Frank Herbert", "9780441172719", 3);
        assert!(matches!(draft.validate(), Err(Error::Constraint(_))));

        let draft = BookDraft::new("Dune", "  ", "9780441172719", 3);
        assert!(matches!(draft.validate(), Err(Error::Constraint(_))));

        let draft = BookDraft::new("Dune", "Frank Herbert", "", 3);
        assert!(matches!(draft.validate(), Err(Error::Constraint(_))));
    }

    #[test]
    fn test_with_location() {
        let draft = BookDraft::new("Dune", "Frank Herbert", "9780441172719", 3)
            .with_location("Main", "A3", "Sci-Fi");
        assert_eq!(draft.room.as_deref(), Some("Main"));
        assert_eq!(draft.shelf.as_deref(), Some("A3"));
        assert_eq!(draft.section.as_deref(), Some("Sci-Fi"));
    }
}
