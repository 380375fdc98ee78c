//! Carol Reservations admin tool.
//!
//! ```bash
//! # Release a branch's carols and delete its submissions
//! carols-admin reset-branch KELANIYA
//!
//! # Copy the local catalog (data/carols.json) into PostgreSQL
//! DATABASE_URL=postgres://... carols-admin migrate
//!
//! # Print catalog totals and claimed carols, optionally for one branch
//! carols-admin check --branch kelaniya
//! ```

#![allow(clippy::print_stdout)]

use anyhow::Context;
use carol_reservations_core::{normalize_all, AppConfig, CarolStorage, CatalogItem, Team};
use carol_reservations_web::bootstrap;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Administrative commands for the carol catalog.
#[derive(Debug, Parser)]
#[command(name = "carols-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Delete a branch's submissions and release its carols.
    ResetBranch {
        /// Branch name (case-insensitive)
        name: String,
    },
    /// Create the database schema and copy the local catalog into it.
    Migrate,
    /// Print catalog totals and claimed carols.
    Check {
        /// Only list carols whose branch contains this text (case-insensitive)
        #[arg(long, short = 'b')]
        branch: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = AppConfig::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,carol_reservations=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::ResetBranch { name } => {
            let service = bootstrap::reservation_service(&config.storage).await?;
            let reset = service.reset_branch(&name).await?;
            println!("Reset branch {}", name.trim());
            println!("  submissions deleted: {}", reset.submissions_deleted);
            println!("  carols released:     {}", reset.carols_reset);
        }
        Commands::Migrate => {
            let database = config
                .storage
                .database
                .as_ref()
                .context("DATABASE_URL is required for migrate")?;
            let remote = carol_reservations_postgres::PostgresCarolStore::connect(database).await?;
            remote.migrate().await?;

            let local = bootstrap::local_store(&config.storage);
            let items = normalize_all(&local.read_all_catalog_items().await?);
            anyhow::ensure!(
                !items.is_empty(),
                "No carols found in {}",
                local.catalog_path().display()
            );
            let count = items.len();
            remote.upsert_catalog_items(items).await?;
            println!("Copied {count} carols into PostgreSQL");
        }
        Commands::Check { branch } => {
            let service = bootstrap::reservation_service(&config.storage).await?;
            let catalog = service.catalog().await?;
            print!("{}", report(&catalog, branch.as_deref()));
        }
    }

    Ok(())
}

/// Totals and claimed carols, optionally filtered by branch substring.
fn report(catalog: &[CatalogItem], branch: Option<&str>) -> String {
    let claimed: Vec<&CatalogItem> = catalog.iter().filter(|item| item.selected).collect();
    let mut out = format!(
        "Total carols: {}\nSelected: {}\nAvailable: {}\n",
        catalog.len(),
        claimed.len(),
        catalog.len() - claimed.len()
    );

    let needle = branch.map(|b| b.trim().to_lowercase());
    let listed = claimed.iter().filter(|item| match &needle {
        Some(needle) => item
            .branch
            .as_deref()
            .is_some_and(|b| b.to_lowercase().contains(needle.as_str())),
        None => true,
    });
    for item in listed {
        let _ = writeln!(
            out,
            "  #{} {} - {} ({})",
            item.id,
            item.name,
            item.branch.as_deref().unwrap_or("?"),
            item.team.map_or("?", Team::as_str),
        );
    }
    out
}
