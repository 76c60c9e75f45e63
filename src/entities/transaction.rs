//! Transaction entity - A single income or expense recorded against an account.
//!
//! The amount is stored as a non-negative magnitude in cents; its sign comes from
//! `kind`. `next_recurring_date` is only set for recurring rows with an interval.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a transaction adds to or takes from the account balance.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money leaving the account
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    /// Money entering the account
    #[sea_orm(string_value = "INCOME")]
    Income,
}

/// How often a recurring transaction repeats.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringInterval {
    /// Every day
    #[sea_orm(string_value = "DAILY")]
    Daily,
    /// Every seven days
    #[sea_orm(string_value = "WEEKLY")]
    Weekly,
    /// Every calendar month
    #[sea_orm(string_value = "MONTHLY")]
    Monthly,
    /// Every calendar year
    #[sea_orm(string_value = "YEARLY")]
    Yearly,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Opaque id of the owning user
    pub user_id: String,
    /// ID of the account this transaction belongs to
    pub account_id: i64,
    /// Expense or income
    pub kind: TransactionType,
    /// Magnitude in cents, never negative
    pub amount_cents: i64,
    /// Day the transaction occurred
    pub date: Date,
    /// Optional free text
    pub description: Option<String>,
    /// Category tag, e.g. `"groceries"`
    pub category: String,
    /// Whether the transaction repeats
    pub is_recurring: bool,
    /// Repeat interval for recurring transactions
    pub recurring_interval: Option<RecurringInterval>,
    /// Next time an external scheduler should materialize this transaction
    pub next_recurring_date: Option<Date>,
    /// When the transaction was created
    pub created_at: DateTimeUtc,
    /// When the transaction row was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Restrict"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
