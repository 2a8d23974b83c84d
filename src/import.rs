//! Bulk Importer - spreadsheet ingest with per-row fault tolerance
//!
//! Expected layout: a header row, then data rows in fixed column order
//! title, author, isbn, quantity, room, shelf, section.
//!
//! Fault policy is two-tier: a row that fails to insert (duplicate ISBN,
//! missing required field) is logged and counted, and the batch keeps
//! going; a file that cannot be opened as a workbook aborts the whole
//! import before anything is committed. All successful inserts land in a
//! single transaction committed once at the end.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::book::BookDraft;
use crate::storage::BookStore;
use crate::storage::sqlite::insert_book;
use crate::{Error, Result};

/// Accepted spreadsheet file extensions
pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Outcome of one import batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportReport {
    /// Rows inserted into the store
    pub inserted: usize,
    /// Rows skipped because the title cell was empty
    pub skipped: usize,
    /// Rows that failed to insert and were left out of the batch
    pub failed: usize,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} inserted, {} skipped, {} failed",
            self.inserted, self.skipped, self.failed
        )
    }
}

/// Whether a file name carries one of the accepted spreadsheet extensions
pub fn is_allowed_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Import every data row of the first worksheet of `path` into the store.
///
/// The file itself is left in place; the upload handler owns staging-file
/// cleanup. Fails with [`Error::File`] on a disallowed extension and
/// [`Error::Workbook`] when the workbook cannot be opened.
pub fn import_workbook(store: &mut BookStore, path: &Path) -> Result<ImportReport> {
    let name = path.to_string_lossy();
    if !is_allowed_file(&name) {
        return Err(Error::File(format!("{}: not a supported spreadsheet", name)));
    }

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::File(format!("{}: workbook has no worksheets", name)))??;

    // row 1 is the header
    import_rows(store, range.rows().skip(1))
}

/// Insert a sequence of data rows inside one transaction.
///
/// Row numbers in log messages are 1-based spreadsheet coordinates, so
/// the first data row is row 2.
pub fn import_rows<'a, I>(store: &mut BookStore, rows: I) -> Result<ImportReport>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut report = ImportReport::default();
    let tx = store.transaction()?;

    for (i, row) in rows.into_iter().enumerate() {
        let row_number = i + 2;
        let Some(draft) = draft_from_row(row) else {
            tracing::debug!("row {}: empty title, skipped", row_number);
            report.skipped += 1;
            continue;
        };

        match insert_book(&tx, &draft) {
            Ok(_) => report.inserted += 1,
            Err(e) => {
                tracing::warn!("row {} ({}): {}", row_number, draft.isbn, e);
                report.failed += 1;
            }
        }
    }

    tx.commit()?;
    tracing::info!("import finished: {}", report);
    Ok(report)
}

/// Map one spreadsheet row onto a draft; `None` when the title cell is
/// empty or absent. Missing cells default to "" (0 for quantity).
fn draft_from_row(row: &[Data]) -> Option<BookDraft> {
    let title = text_cell(row, 0);
    if title.is_empty() {
        return None;
    }

    Some(BookDraft {
        title,
        author: text_cell(row, 1),
        isbn: text_cell(row, 2),
        quantity: int_cell(row, 3),
        room: Some(text_cell(row, 4)),
        shelf: Some(text_cell(row, 5)),
        section: Some(text_cell(row, 6)),
    })
}

/// Text cell content; whole numbers are rendered without a decimal point
/// since Excel stores bare ISBNs as floats.
fn text_cell(row: &[Data], idx: usize) -> String {
    match row.get(idx) {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Float(f)) if f.fract() == 0.0 => format!("{}", *f as i64),
        Some(other) => other.to_string(),
    }
}

fn int_cell(row: &[Data], idx: usize) -> i64 {
    match row.get(idx) {
        Some(Data::Int(i)) => *i,
        Some(Data::Float(f)) => *f as i64,
        Some(Data::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<Data> {
        cells
            .iter()
            .map(|c| {
                if c.is_empty() {
                    Data::Empty
                } else {
                    Data::String(c.to_string())
                }
            })
            .collect()
    }

    fn run(rows: &[Vec<Data>]) -> (BookStore, ImportReport) {
        let mut store = BookStore::open_in_memory().unwrap();
        let report = import_rows(&mut store, rows.iter().map(|r| r.as_slice())).unwrap();
        (store, report)
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(is_allowed_file("books.xlsx"));
        assert!(is_allowed_file("BOOKS.XLS"));
        assert!(!is_allowed_file("books.csv"));
        assert!(!is_allowed_file("books"));
    }

    #[test]
    fn test_import_valid_rows() {
        let rows = vec![
            text_row(&["Dune", "Frank Herbert", "9780441172719", "3", "Main", "A3", "Sci-Fi"]),
            text_row(&["Neuromancer", "William Gibson", "9780441569595", "1", "", "", ""]),
        ];
        let (store, report) = run(&rows);

        assert_eq!(report, ImportReport { inserted: 2, skipped: 0, failed: 0 });
        let books = store.list_all().unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].quantity, 3);
        assert_eq!(books[0].shelf.as_deref(), Some("A3"));
    }

    #[test]
    fn test_duplicate_isbn_row_does_not_abort_batch() {
        let rows = vec![
            text_row(&["Book 1", "A", "isbn-1", "1"]),
            text_row(&["Book 2", "B", "isbn-2", "1"]),
            text_row(&["Book 3", "C", "isbn-3", "1"]),
            text_row(&["Book 4", "D", "isbn-1", "1"]), // duplicate of row 2
            text_row(&["Book 5", "E", "isbn-5", "1"]),
        ];
        let (store, report) = run(&rows);

        assert_eq!(report.inserted, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(store.count().unwrap(), 4);
        // the rows after the bad one still landed
        assert_eq!(store.search("isbn-5").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_title_row_is_skipped() {
        let rows = vec![
            text_row(&["Book 1", "A", "isbn-1", "1"]),
            text_row(&["", "ghost", "isbn-2", "1"]),
            vec![], // entirely empty row
            text_row(&["Book 3", "C", "isbn-3", "1"]),
        ];
        let (store, report) = run(&rows);

        assert_eq!(report, ImportReport { inserted: 2, skipped: 2, failed: 0 });
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_missing_cells_default_to_empty() {
        let rows = vec![text_row(&["Bare Minimum", "Anon", "isbn-9"])];
        let (store, report) = run(&rows);

        assert_eq!(report.inserted, 1);
        let book = &store.list_all().unwrap()[0];
        assert_eq!(book.quantity, 0);
        assert_eq!(book.room.as_deref(), Some(""));
        assert_eq!(book.section.as_deref(), Some(""));
    }

    #[test]
    fn test_row_with_empty_isbn_fails_but_counts() {
        let rows = vec![
            text_row(&["No ISBN", "A", "", "1"]),
            text_row(&["Fine", "B", "isbn-1", "1"]),
        ];
        let (store, report) = run(&rows);

        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_numeric_cells_are_stringified() {
        let rows = vec![vec![
            Data::String("Dune".to_string()),
            Data::String("Frank Herbert".to_string()),
            Data::Float(9780441172719.0),
            Data::Float(3.0),
        ]];
        let (store, report) = run(&rows);

        assert_eq!(report.inserted, 1);
        let book = &store.list_all().unwrap()[0];
        assert_eq!(book.isbn, "9780441172719");
        assert_eq!(book.quantity, 3);
    }

    #[test]
    fn test_disallowed_extension_rejected_before_store_touched() {
        let mut store = BookStore::open_in_memory().unwrap();
        let err = import_workbook(&mut store, Path::new("books.csv")).unwrap_err();
        assert!(matches!(err, Error::File(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_unreadable_workbook_aborts_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-really.xlsx");
        std::fs::write(&path, b"garbage").unwrap();

        let mut store = BookStore::open_in_memory().unwrap();
        let err = import_workbook(&mut store, &path).unwrap_err();
        assert!(matches!(err, Error::Workbook(_)));
        assert_eq!(store.count().unwrap(), 0);
    }
}
