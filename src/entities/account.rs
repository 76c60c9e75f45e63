//! Account entity - A user's monetary account.
//!
//! Each account belongs to one user, carries a persisted balance that is kept in step
//! with its transactions, and may be the user's default account.
//! Money columns hold integer minor units (cents).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of account as shown to the user.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    /// Everyday spending account
    #[sea_orm(string_value = "CURRENT")]
    Current,
    /// Savings account
    #[sea_orm(string_value = "SAVINGS")]
    Savings,
}

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Opaque id of the owning user
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Current or savings
    pub kind: AccountKind,
    /// Current balance in cents
    pub balance_cents: i64,
    /// Balance the account was opened with, in cents
    pub opening_balance_cents: i64,
    /// Whether this is the user's default account
    pub is_default: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
    /// When the account row was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One account has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
