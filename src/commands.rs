//! CLI command implementations

use std::path::Path;

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use bookstock::book::Book;
use bookstock::config::{self, AppConfig};
use bookstock::import;
use bookstock::storage::BookStore;

#[derive(Tabled)]
struct BookRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "ISBN")]
    isbn: String,
    #[tabled(rename = "Qty")]
    quantity: i64,
    #[tabled(rename = "Location")]
    location: String,
}

impl From<&Book> for BookRow {
    fn from(book: &Book) -> Self {
        let location = [&book.room, &book.shelf, &book.section]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" / ");
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            quantity: book.quantity,
            location,
        }
    }
}

pub fn run_list(database: &Path, json: bool) -> anyhow::Result<()> {
    let store = BookStore::open(database)?;
    let books = store.list_all()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("∅ No books in {}", database.display());
        return Ok(());
    }

    let rows: Vec<BookRow> = books.iter().map(BookRow::from).collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    println!("{}", store.stats()?.to_string().dimmed());
    Ok(())
}

pub fn run_import(database: &Path, file: &Path) -> anyhow::Result<()> {
    config::ensure_db_dir(database)?;
    let mut store = BookStore::open(database)?;

    println!("📥 Importing {} into {}", file.display(), database.display());
    let report = import::import_workbook(&mut store, file)?;

    if report.failed > 0 {
        println!("{} {} (failed rows are logged above)", "⚠".yellow(), report);
    } else {
        println!("{} {}", "✓".green(), report);
    }
    Ok(())
}

pub fn run_init(config_path: &Path, config: &AppConfig, force: bool) -> anyhow::Result<()> {
    config::write_config(config_path, config, force)?;
    println!("{} Wrote {}", "✓".green(), config_path.display());
    Ok(())
}
