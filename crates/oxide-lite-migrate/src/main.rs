//! oxide-lite-migrate CLI
//!
//! Command-line tool for snapshot-based migrations.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use oxide_lite_core::Registry;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_lite_migrate::prelude::*;

/// Snapshot-based migrations for SQLite schemas.
#[derive(Parser)]
#[command(name = "oxide-lite-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Declared-schema JSON file.
    #[arg(short, long, env = "OXIDE_LITE_SCHEMA")]
    schema: Option<PathBuf>,

    /// Where snapshots are kept.
    #[arg(long, value_enum, default_value_t = StoreKind::File)]
    store: StoreKind,

    /// Snapshot file for the file store.
    #[arg(long, default_value = "migrations.json")]
    snapshot_file: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    /// A JSON file.
    File,
    /// The `oxide_lite_migrations` table.
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the changes between the declared schema and the last snapshot.
    #[command(name = "makemigrations")]
    MakeMigrations,

    /// Apply the changes and persist a new snapshot.
    Migrate,

    /// Show the last applied snapshot.
    #[command(name = "showmigrations")]
    ShowMigrations,

    /// Show the SQL `migrate` would run, without running it.
    #[command(name = "sqlmigrate")]
    SqlMigrate,
}

async fn declared(cli: &Cli) -> anyhow::Result<Registry> {
    match &cli.schema {
        Some(path) => Ok(SchemaSpec::load(path).await?.registry()?),
        None => anyhow::bail!("a schema file is required (--schema or OXIDE_LITE_SCHEMA)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Connect to database
    let options = SqliteConnectOptions::from_str(&cli.database)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    let store = match cli.store {
        StoreKind::File => SnapshotStore::file(&cli.snapshot_file),
        StoreKind::Table => SnapshotStore::Table,
    };

    match &cli.command {
        Commands::MakeMigrations => {
            let mut migrations = Migrations::new(pool, declared(&cli).await?, store);
            let plan = migrations.make_migrations().await?;
            if plan.is_empty() {
                info!("No changes detected.");
            } else {
                println!("\nPending operations:");
                println!("{:-<60}", "");
                for operation in plan.operations() {
                    println!("  - {operation}");
                }
                println!();
            }
        }

        Commands::Migrate => {
            let mut migrations = Migrations::new(pool, declared(&cli).await?, store);
            let report = migrations.migrate().await?;
            if report.is_empty() {
                info!("No migrations to apply.");
            } else {
                info!(
                    "Applied {} statement(s), schema is now at snapshot {}.",
                    report.statements.len(),
                    report.number
                );
            }
        }

        Commands::ShowMigrations => {
            let migrations = Migrations::new(pool, Registry::new(), store);
            let latest = migrations.latest().await?;
            if latest.number == 0 {
                info!("No migrations have been applied yet.");
            } else {
                println!("\nSnapshot {} ({})", latest.number, latest.id);
                println!("{:-<60}", "");
                println!(" applied: {}", latest.date.format("%Y-%m-%d %H:%M:%S"));
                for table in &latest.tables {
                    println!(" [X] {} ({} columns)", table.name, table.fields.len());
                }
                println!();
            }
        }

        Commands::SqlMigrate => {
            let mut migrations = Migrations::new(pool, declared(&cli).await?, store);
            for sql in migrations.sql_migrate().await? {
                println!("{sql};");
            }
        }
    }

    Ok(())
}
