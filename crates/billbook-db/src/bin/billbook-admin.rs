//! # Billbook Admin
//!
//! Operator tool for the numbering counters and the pricing engine.
//!
//! ## Usage
//! ```bash
//! # Show the next number for every kind (reserves nothing)
//! cargo run -p billbook-db --bin billbook-admin -- peek
//!
//! # Reserve the next invoice number
//! cargo run -p billbook-db --bin billbook-admin -- generate invoice
//!
//! # Check counters against saved documents
//! cargo run -p billbook-db --bin billbook-admin -- reconcile
//!
//! # Price a JSON array of line items with the configured tax table
//! cargo run -p billbook-db --bin billbook-admin -- price ./items.json
//!
//! # Use another config file or database
//! cargo run -p billbook-db --bin billbook-admin -- --config ./billbook.toml --db ./dev.db peek
//! ```
//!
//! Logs go to stderr (`RUST_LOG=debug` for more); results go to stdout.

use std::env;
use std::path::{Path, PathBuf};

use billbook_core::{DocumentKind, LineItem, Money};
use billbook_db::{Database, EngineConfig, NumberingService};
use tracing_subscriber::EnvFilter;

enum Command {
    Price(PathBuf),
    Counters(CounterCommand),
}

/// Commands that open the database.
enum CounterCommand {
    Peek(Option<DocumentKind>),
    Generate(DocumentKind),
    Reconcile,
}

fn print_help() {
    println!("Billbook Admin");
    println!();
    println!("Usage: billbook-admin [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  peek [invoice|quote]       Show the next number without reserving it");
    println!("  generate <invoice|quote>   Reserve and print the next number");
    println!("  reconcile                  Compare counters with saved documents");
    println!("  price <items.json>         Price a JSON array of line items");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>   Config file (default: platform config dir)");
    println!("  -d, --db <PATH>       Database file (overrides config)");
    println!("  -h, --help            Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = match positional.first().map(String::as_str) {
        Some("peek") => Command::Counters(CounterCommand::Peek(
            positional.get(1).map(|k| k.parse()).transpose()?,
        )),
        Some("generate") => match positional.get(1) {
            Some(kind) => Command::Counters(CounterCommand::Generate(kind.parse()?)),
            None => return Err("generate needs a kind: invoice or quote".into()),
        },
        Some("reconcile") => Command::Counters(CounterCommand::Reconcile),
        Some("price") => match positional.get(1) {
            Some(path) => Command::Price(PathBuf::from(path)),
            None => return Err("price needs a path to a JSON file of line items".into()),
        },
        Some(other) => return Err(format!("unknown command: {}", other).into()),
        None => {
            print_help();
            return Ok(());
        }
    };

    let mut config = EngineConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    match command {
        Command::Price(path) => price(&config, &path)?,
        Command::Counters(command) => {
            if let Some(parent) = config.database.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let db = Database::new(config.db_config()).await?;
            let numbering =
                NumberingService::open(db.sequences(), &db.documents(), config.numbering.clone())
                    .await?;

            match command {
                CounterCommand::Peek(Some(kind)) => {
                    println!("{}", numbering.peek_next(kind).await?);
                }
                CounterCommand::Peek(None) => {
                    for kind in DocumentKind::ALL {
                        println!("{:<8} {}", kind, numbering.peek_next(kind).await?);
                    }
                }
                CounterCommand::Generate(kind) => {
                    println!("{}", numbering.generate(kind).await?);
                }
                CounterCommand::Reconcile => {
                    let report = numbering.startup_report();
                    println!("{}", serde_json::to_string_pretty(report)?);

                    for row in db.sequences().list().await? {
                        let saved = db.documents().count(row.kind).await?;
                        println!(
                            "{:<8} next={:<8} saved={:<6} updated={}",
                            row.kind, row.next_value, saved, row.updated_at
                        );
                    }
                }
            }

            db.close().await;
        }
    }

    Ok(())
}

/// Prices a JSON array of line items and prints lines, totals and warnings.
fn price(config: &EngineConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let items: Vec<LineItem> = serde_json::from_str(&contents)?;

    let priced = config
        .pricing_engine()
        .price_document(&items, &config.tax_table());

    for line in &priced.lines {
        println!(
            "{:<12} base {:>12}  disc {:>12}  tax {:>12}  total {:>12}",
            line.line_id,
            Money::from_cents(line.base_cents),
            Money::from_cents(line.discount_cents),
            Money::from_cents(line.tax_cents),
            Money::from_cents(line.total_cents),
        );
    }
    println!();
    println!("Subtotal {:>12}", Money::from_cents(priced.totals.subtotal_cents));
    println!("Discount {:>12}", Money::from_cents(priced.totals.discount_cents));
    println!("Tax      {:>12}", Money::from_cents(priced.totals.tax_cents));
    println!("Total    {:>12}", priced.totals.total());

    for warning in &priced.warnings {
        eprintln!("warning: {}", warning);
    }

    Ok(())
}
