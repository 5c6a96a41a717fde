//! CLI command implementations.

pub mod migrate;
pub mod orders;
pub mod seed;

use sqlx::PgPool;
use thiserror::Error;

use voentorg_storefront::config::{self, ConfigError};
use voentorg_storefront::db::{self, RepositoryError};
use voentorg_storefront::services::{AuthError, OrderError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Account error: {0}")]
    Auth(#[from] AuthError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid slug: {0}")]
    Slug(#[from] voentorg_core::SlugError),

    #[error("{0} validation errors in catalog file")]
    InvalidCatalog(usize),

    #[error("Unknown order status: {0}")]
    InvalidStatus(String),
}

/// Connect to the storefront database named by the environment.
async fn connect() -> Result<PgPool, CliError> {
    let database_url = config::database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url).await?)
}
