//! Inputs accepted from callers and views returned to them.
//!
//! Views carry money as exact `Decimal`s and dates as ISO-8601, which is how they cross
//! any transport boundary.

use crate::entities::{
    AccountKind, AccountModel, RecurringInterval, TransactionModel, TransactionType,
};
use crate::core::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to open an account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAccount {
    /// Display name
    pub name: String,
    /// Current or savings
    pub kind: AccountKind,
    /// Opening balance as a decimal string; may be negative
    pub initial_balance: String,
    /// Whether the caller wants this to become the default account
    #[serde(default)]
    pub is_default: bool,
}

/// Caller-supplied transaction fields, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionDraft {
    /// Account to book against
    pub account_id: i64,
    /// Expense or income
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Non-negative magnitude as a decimal string
    pub amount: String,
    /// Day the transaction occurred
    pub date: NaiveDate,
    /// Optional free text
    #[serde(default)]
    pub description: Option<String>,
    /// Category tag
    pub category: String,
    /// Whether the transaction repeats
    #[serde(default)]
    pub is_recurring: bool,
    /// Repeat interval, required when `is_recurring`
    #[serde(default)]
    pub recurring_interval: Option<RecurringInterval>,
}

/// Account as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    /// Account id
    pub id: i64,
    /// Owning user
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Current or savings
    pub kind: AccountKind,
    /// Current balance
    pub balance: Decimal,
    /// Opening balance
    pub opening_balance: Decimal,
    /// Whether this is the user's default account
    pub is_default: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl From<AccountModel> for AccountView {
    fn from(model: AccountModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            kind: model.kind,
            balance: Money::from_cents(model.balance_cents).to_decimal(),
            opening_balance: Money::from_cents(model.opening_balance_cents).to_decimal(),
            is_default: model.is_default,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Transaction as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    /// Transaction id
    pub id: i64,
    /// Owning user
    pub user_id: String,
    /// Account the transaction is booked against
    pub account_id: i64,
    /// Expense or income
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Non-negative magnitude
    pub amount: Decimal,
    /// Day the transaction occurred
    pub date: NaiveDate,
    /// Optional free text
    pub description: Option<String>,
    /// Category tag
    pub category: String,
    /// Whether the transaction repeats
    pub is_recurring: bool,
    /// Repeat interval
    pub recurring_interval: Option<RecurringInterval>,
    /// When the next occurrence is due
    pub next_recurring_date: Option<NaiveDate>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl From<TransactionModel> for TransactionView {
    fn from(model: TransactionModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            account_id: model.account_id,
            kind: model.kind,
            amount: Money::from_cents(model.amount_cents).to_decimal(),
            date: model.date,
            description: model.description,
            category: model.category,
            is_recurring: model.is_recurring,
            recurring_interval: model.recurring_interval,
            next_recurring_date: model.next_recurring_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// An account together with its transactions, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountLedger {
    /// The account
    pub account: AccountView,
    /// Number of transactions attached
    pub transaction_count: usize,
    /// Attached transactions ordered by date descending
    pub transactions: Vec<TransactionView>,
}

/// Result of a bulk delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDeleteOutcome {
    /// Rows removed
    pub deleted: usize,
    /// Balance change applied to each touched account
    pub balance_changes: Vec<(i64, Decimal)>,
}
