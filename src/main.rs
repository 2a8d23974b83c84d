//! Bookstock CLI - library book inventory manager

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use bookstock::config::{self, AppConfig};

#[derive(Parser)]
#[command(name = "bookstock")]
#[command(version = "0.1.0")]
#[command(about = "Library book inventory manager - CRUD, search, and spreadsheet bulk import")]
#[command(long_about = r#"
Bookstock keeps a library's book inventory in a local SQLite file and
serves it to a browser-based admin page.

Example usage:
  bookstock serve --port 5000
  bookstock import catalogue.xlsx
  bookstock list --json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: bookstock.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Staging directory for uploaded spreadsheets
        #[arg(short, long)]
        uploads: Option<PathBuf>,
    },

    /// Bulk-import a spreadsheet (.xlsx/.xls) into the inventory
    Import {
        /// Workbook to import; the file is left in place
        file: PathBuf,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print the inventory
    List {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a starter config file
    Init {
        /// Database path to record in the config
        #[arg(short, long)]
        database: Option<String>,

        /// Upload staging directory to record in the config
        #[arg(short, long)]
        uploads: Option<String>,

        /// Port to record in the config
        #[arg(short, long)]
        port: Option<u16>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Serve {
            port,
            database,
            uploads,
        } => {
            let port = port.unwrap_or_else(|| config.port());
            let database = database.unwrap_or_else(|| config.database_path());
            let uploads = uploads.unwrap_or_else(|| config.upload_dir());
            config::ensure_db_dir(&database)?;

            tracing::info!("Serving {} on port {}", database.display(), port);
            tokio::runtime::Runtime::new()?.block_on(bookstock::server::start_server(
                port, database, uploads,
            ))?;
        }

        Commands::Import { file, database } => {
            let database = database.unwrap_or_else(|| config.database_path());
            commands::run_import(&database, &file)?;
        }

        Commands::List { database, json } => {
            let database = database.unwrap_or_else(|| config.database_path());
            commands::run_list(&database, json)?;
        }

        Commands::Init {
            database,
            uploads,
            port,
            force,
        } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let new_config = AppConfig {
                database,
                uploads,
                port,
            };
            commands::run_init(&path, &new_config, force)?;
        }
    }

    Ok(())
}
