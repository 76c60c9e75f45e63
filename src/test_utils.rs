//! Shared test utilities for the ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test accounts and transactions with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    config::{app::DatabaseSettings, database},
    core::{account, identity::UserId, transaction},
    entities::{AccountKind, TransactionType},
    errors::Result,
    models::{AccountView, NewAccount, TransactionDraft, TransactionView},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::str::FromStr;
use tempfile::TempDir;

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// Every pooled connection to `sqlite::memory:` would open its own empty database, so the
/// pool is pinned to a single connection.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    let db = database::create_connection(&settings).await?;
    database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed database in a fresh temporary directory, pooled like production.
///
/// Keep the returned directory alive for as long as the connection is used.
pub async fn setup_file_db(max_connections: u32) -> Result<(TempDir, DatabaseConnection)> {
    let dir = tempfile::tempdir().unwrap();
    let settings = DatabaseSettings {
        url: format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("ledger.sqlite").display()
        ),
        max_connections,
    };
    let db = database::create_connection(&settings).await?;
    database::create_tables(&db).await?;
    Ok((dir, db))
}

/// An authenticated user with the given identity.
pub fn test_user(identity: &str) -> UserId {
    UserId::from_identity(Some(identity)).unwrap()
}

/// Parses a decimal literal.
pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

/// Shorthand for a calendar date.
pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Request for a current account that does not ask to be the default.
pub fn new_account(name: &str, initial_balance: &str) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        kind: AccountKind::Current,
        initial_balance: initial_balance.to_string(),
        is_default: false,
    }
}

/// One-off transaction draft.
///
/// # Defaults
/// * `date`: 2024-01-15
/// * `description`: None
/// * `category`: "general"
pub fn draft(account_id: i64, kind: TransactionType, amount: &str) -> TransactionDraft {
    TransactionDraft {
        account_id,
        kind,
        amount: amount.to_string(),
        date: day(2024, 1, 15),
        description: None,
        category: "general".to_string(),
        is_recurring: false,
        recurring_interval: None,
    }
}

/// Creates a current account with the given opening balance.
pub async fn create_test_account(
    db: &DatabaseConnection,
    user: &UserId,
    name: &str,
    initial_balance: &str,
) -> Result<AccountView> {
    account::create_account(db, user, &new_account(name, initial_balance)).await
}

/// Records a one-off transaction built by [`draft`].
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    user: &UserId,
    account_id: i64,
    kind: TransactionType,
    amount: &str,
) -> Result<TransactionView> {
    transaction::create_transaction(db, user, &draft(account_id, kind, amount)).await
}
