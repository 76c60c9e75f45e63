//! Database configuration module for the ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. One index cannot be expressed on the
//! entities: the partial unique index that allows at most one default account per user.

use crate::config::app::DatabaseSettings;
use crate::entities::{Account, Transaction};
use crate::errors::{Error, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

const SINGLE_DEFAULT_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_single_default \
     ON accounts(user_id) WHERE is_default = 1";

const TRANSACTION_OWNER_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_transactions_user_date \
     ON transactions(user_id, date)";

/// Opens a pooled connection to the configured database.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_connection(settings: &DatabaseSettings) -> Result<DatabaseConnection> {
    ensure_database_dir(&settings.url)?;
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .min_connections(1)
        .sqlx_logging(false);
    debug!("Connecting to database");
    Database::connect(options).await.map_err(Into::into)
}

/// Creates the directory of a file-backed SQLite database so `mode=rwc` can create the file.
fn ensure_database_dir(url: &str) -> Result<()> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(file)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::Config {
            message: format!("Failed to create database directory {parent:?}: {e}"),
        })?;
    }
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Safe to call on every start-up.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut account_table = schema.create_table_from_entity(Account);
    account_table.if_not_exists();
    let mut transaction_table = schema.create_table_from_entity(Transaction);
    transaction_table.if_not_exists();

    db.execute(builder.build(&account_table)).await?;
    db.execute(builder.build(&transaction_table)).await?;
    db.execute_unprepared(SINGLE_DEFAULT_INDEX).await?;
    db.execute_unprepared(TRANSACTION_OWNER_INDEX).await?;

    info!("Database tables ensured");
    Ok(())
}
