use cart_engine::application::session::OrderSession;
use cart_engine::domain::cart::{DEFAULT_TAX_RATE, Pricing};
use cart_engine::domain::catalog::Catalog;
use cart_engine::domain::ports::{CartStoreBox, SessionId};
use cart_engine::infrastructure::in_memory::InMemoryCartStore;
#[cfg(feature = "storage-rocksdb")]
use cart_engine::infrastructure::rocksdb::RocksDBCartStore;
use cart_engine::interfaces::csv::command_reader::CommandReader;
use cart_engine::interfaces::csv::receipt_writer::ReceiptWriter;
use cart_engine::logging;
use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input cart commands CSV file
    input: PathBuf,

    /// Menu catalog JSON file. Uses the built-in sample menu when omitted.
    #[arg(long)]
    menu: Option<PathBuf>,

    /// Sales tax rate applied to the subtotal
    #[arg(long, env = "CART_TAX_RATE", default_value_t = DEFAULT_TAX_RATE)]
    tax_rate: Decimal,

    /// Session whose cart the commands apply to
    #[arg(long, default_value = "default")]
    session: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Receipt format written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Log session activity at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn open_store(db_path: Option<PathBuf>) -> Result<CartStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBCartStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryCartStore::new()))
        }
        None => Ok(Box::new(InMemoryCartStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let catalog = match &cli.menu {
        Some(path) => Catalog::from_path(path),
        None => Catalog::builtin(),
    }
    .into_diagnostic()?;
    let pricing = Pricing::new(cli.tax_rate).into_diagnostic()?;
    let store = open_store(cli.db_path)?;

    let mut session = OrderSession::open(
        SessionId::new(cli.session),
        store,
        Arc::new(catalog),
        pricing,
    )
    .await
    .into_diagnostic()?;

    // Process commands
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (index, command_result) in reader.commands().enumerate() {
        let row = index + 1;
        match command_result {
            Ok(command) => {
                if let Err(e) = session.execute(command).await {
                    tracing::warn!(row, error = %e, "Error processing command");
                }
            }
            Err(e) => {
                tracing::warn!(row, error = %e, "Error reading command");
            }
        }
    }

    // Output final state
    let snapshot = session.snapshot().into_diagnostic()?;
    let stdout = io::stdout();
    match cli.format {
        OutputFormat::Csv => {
            let mut writer = ReceiptWriter::new(stdout.lock());
            writer.write_snapshot(&snapshot).into_diagnostic()?;
        }
        OutputFormat::Json => {
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &snapshot).into_diagnostic()?;
            writeln!(out).into_diagnostic()?;
        }
    }

    Ok(())
}
