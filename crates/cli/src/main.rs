//! Voentorg CLI - Database migrations, catalog seeding and order handling.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! vt-cli migrate
//!
//! # Load the demo catalog (categories, products, test users)
//! vt-cli seed --file crates/cli/data/catalog.yaml
//!
//! # Wipe the catalog first, then load it
//! vt-cli seed --clear
//!
//! # Move an order along its lifecycle
//! vt-cli orders set-status 42 shipped
//!
//! # Print an order with its items
//! vt-cli orders show 42
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "vt-cli")]
#[command(author, version, about = "Voentorg CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Load categories, products and test users from a YAML file
    Seed {
        /// Path to the catalog file
        #[arg(short, long, default_value = commands::seed::DEFAULT_CATALOG_FILE)]
        file: PathBuf,

        /// Delete existing products and categories first
        #[arg(long)]
        clear: bool,
    },
    /// Inspect and update orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Apply a status transition (`processing`, `shipped`, `delivered`, `cancelled`)
    SetStatus {
        /// Order ID
        id: i32,
        /// New status code
        status: String,
    },
    /// Print an order with its items
    Show {
        /// Order ID
        id: i32,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vt_cli=info,voentorg_storefront=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { file, clear } => commands::seed::catalog(&file, clear).await?,
        Commands::Orders { action } => match action {
            OrdersAction::SetStatus { id, status } => {
                commands::orders::set_status(id, &status).await?;
            }
            OrdersAction::Show { id } => commands::orders::show(id).await?,
        },
    }
    Ok(())
}
