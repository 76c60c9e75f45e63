//! Account business logic - The account registry.
//!
//! Owns account records and the single-default-account invariant: for every user with at
//! least one account, exactly one is the default. This module holds the only code paths
//! that write `is_default`, and the only primitive that changes a balance
//! ([`adjust_balance`]). Every write runs inside one database transaction, and a partial
//! unique index in the store rejects a second default outright.

use crate::{
    core::{identity::UserId, money::Money, retry::retry_on_conflict},
    entities::{Account, AccountKind, Transaction, account, transaction},
    errors::{Error, Result},
    models::{AccountLedger, AccountView, NewAccount},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Opens a new account for the caller.
///
/// The caller's first account is always the default, whatever was requested. Requesting
/// default on a later account clears the flag on its siblings in the same transaction.
///
/// # Errors
/// [`Error::Validation`] for a blank name or a non-numeric opening balance.
#[instrument(skip(db, new_account), fields(user = %user))]
pub async fn create_account(
    db: &DatabaseConnection,
    user: &UserId,
    new_account: &NewAccount,
) -> Result<AccountView> {
    let name = new_account.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Account name cannot be empty"));
    }
    let opening = Money::parse(&new_account.initial_balance)?;

    let created = retry_on_conflict("create_account", || {
        insert_account(
            db,
            user,
            name,
            new_account.kind,
            opening,
            new_account.is_default,
        )
    })
    .await?;

    info!(
        account_id = created.id,
        is_default = created.is_default,
        "Account created"
    );
    Ok(created.into())
}

async fn insert_account(
    db: &DatabaseConnection,
    user: &UserId,
    name: &str,
    kind: AccountKind,
    opening: Money,
    requested_default: bool,
) -> Result<account::Model> {
    let txn = db.begin().await?;

    // Insert before reading siblings so the unit holds the write lock from its first statement.
    let now = Utc::now();
    let inserted = account::ActiveModel {
        user_id: Set(user.as_str().to_string()),
        name: Set(name.to_string()),
        kind: Set(kind),
        balance_cents: Set(opening.cents()),
        opening_balance_cents: Set(opening.cents()),
        is_default: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let owned = Account::find()
        .filter(account::Column::UserId.eq(user.as_str()))
        .count(&txn)
        .await?;

    let model = if owned == 1 || requested_default {
        clear_default(&txn, user, now).await?;
        let mut active: account::ActiveModel = inserted.into();
        active.is_default = Set(true);
        active.update(&txn).await?
    } else {
        inserted
    };

    txn.commit().await?;
    Ok(model)
}

/// Makes `account_id` the caller's default account.
///
/// Clearing the old default and setting the new one happen in one transaction, so no
/// reader sees zero or two defaults. Calling it on the current default changes nothing.
#[instrument(skip(db), fields(user = %user))]
pub async fn set_default_account(
    db: &DatabaseConnection,
    user: &UserId,
    account_id: i64,
) -> Result<AccountView> {
    let account =
        retry_on_conflict("set_default_account", || swap_default(db, user, account_id)).await?;
    Ok(account.into())
}

async fn swap_default(
    db: &DatabaseConnection,
    user: &UserId,
    account_id: i64,
) -> Result<account::Model> {
    let txn = db.begin().await?;

    lock_accounts(&txn, user).await?;
    let target = find_owned_account(&txn, user, account_id).await?;
    if target.is_default {
        debug!(account_id, "Account is already the default");
        txn.commit().await?;
        return Ok(target);
    }

    let now = Utc::now();
    clear_default(&txn, user, now).await?;

    let mut active: account::ActiveModel = target.into();
    active.is_default = Set(true);
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(account_id, "Default account changed");
    Ok(updated)
}

async fn clear_default<C>(conn: &C, user: &UserId, now: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    Account::update_many()
        .col_expr(account::Column::IsDefault, Expr::value(false))
        .col_expr(account::Column::UpdatedAt, Expr::value(now))
        .filter(account::Column::UserId.eq(user.as_str()))
        .filter(account::Column::IsDefault.eq(true))
        .exec(conn)
        .await?;
    Ok(())
}

/// Finds one of the caller's accounts.
#[instrument(skip(db), fields(user = %user))]
pub async fn get_account(
    db: &DatabaseConnection,
    user: &UserId,
    account_id: i64,
) -> Result<AccountView> {
    find_owned_account(db, user, account_id)
        .await
        .map(Into::into)
}

/// All of the caller's accounts, newest first.
pub async fn list_accounts(db: &DatabaseConnection, user: &UserId) -> Result<Vec<AccountView>> {
    let accounts = Account::find()
        .filter(account::Column::UserId.eq(user.as_str()))
        .order_by_desc(account::Column::CreatedAt)
        .order_by_desc(account::Column::Id)
        .all(db)
        .await?;
    Ok(accounts.into_iter().map(Into::into).collect())
}

/// The caller's default account, `None` if they have no accounts.
pub async fn default_account(
    db: &DatabaseConnection,
    user: &UserId,
) -> Result<Option<AccountView>> {
    let account = Account::find()
        .filter(account::Column::UserId.eq(user.as_str()))
        .filter(account::Column::IsDefault.eq(true))
        .one(db)
        .await?;
    Ok(account.map(Into::into))
}

/// An account with its transactions, newest first.
#[instrument(skip(db), fields(user = %user))]
pub async fn get_account_with_transactions(
    db: &DatabaseConnection,
    user: &UserId,
    account_id: i64,
) -> Result<AccountLedger> {
    let account = find_owned_account(db, user, account_id).await?;
    let transactions = Transaction::find()
        .filter(transaction::Column::AccountId.eq(account_id))
        .filter(transaction::Column::UserId.eq(user.as_str()))
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await?;

    Ok(AccountLedger {
        account: account.into(),
        transaction_count: transactions.len(),
        transactions: transactions.into_iter().map(Into::into).collect(),
    })
}

/// Deletes an account that has no transactions.
///
/// Refuses with [`Error::Validation`] while transactions are attached. Deleting the default
/// promotes the caller's newest remaining account.
#[instrument(skip(db), fields(user = %user))]
pub async fn delete_account(db: &DatabaseConnection, user: &UserId, account_id: i64) -> Result<()> {
    retry_on_conflict("delete_account", || remove_account(db, user, account_id)).await
}

async fn remove_account(db: &DatabaseConnection, user: &UserId, account_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    lock_accounts(&txn, user).await?;
    let target = find_owned_account(&txn, user, account_id).await?;
    let attached = Transaction::find()
        .filter(transaction::Column::AccountId.eq(account_id))
        .count(&txn)
        .await?;
    if attached > 0 {
        return Err(Error::validation(format!(
            "Account {account_id} still has {attached} transactions"
        )));
    }

    Account::delete_by_id(account_id).exec(&txn).await?;

    if target.is_default {
        let successor = Account::find()
            .filter(account::Column::UserId.eq(user.as_str()))
            .order_by_desc(account::Column::CreatedAt)
            .order_by_desc(account::Column::Id)
            .one(&txn)
            .await?;
        if let Some(successor) = successor {
            let mut active: account::ActiveModel = successor.into();
            active.is_default = Set(true);
            active.updated_at = Set(Utc::now());
            let promoted = active.update(&txn).await?;
            info!(account_id = promoted.id, "Promoted new default account");
        }
    }

    txn.commit().await?;
    info!(account_id, "Account deleted");
    Ok(())
}

/// Takes the store's write lock with an update that changes nothing.
///
/// SQLite transactions start deferred. A unit that reads before its first write would have
/// to upgrade its read lock, and that upgrade fails at once under contention instead of
/// waiting out the busy timeout. Units that read first call this before anything else.
async fn lock_accounts<C>(conn: &C, user: &UserId) -> Result<()>
where
    C: ConnectionTrait,
{
    Account::update_many()
        .col_expr(account::Column::Id, Expr::col(account::Column::Id).into())
        .filter(account::Column::UserId.eq(user.as_str()))
        .exec(conn)
        .await?;
    Ok(())
}

/// Loads an account only if it belongs to `user`.
///
/// Accounts of other users are reported exactly like missing ones.
pub(crate) async fn find_owned_account<C>(
    conn: &C,
    user: &UserId,
    account_id: i64,
) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    Account::find_by_id(account_id)
        .filter(account::Column::UserId.eq(user.as_str()))
        .one(conn)
        .await?
        .ok_or(Error::AccountNotFound { id: account_id })
}

/// Atomically adds `delta` to an account balance.
///
/// Runs as a single `UPDATE accounts SET balance_cents = balance_cents + ?` so concurrent
/// increments are never lost, and must be called on the same database transaction as the
/// transaction-row write it accompanies. Matching no row means the account is missing or
/// not the caller's, so callers may issue it first and use it as the ownership check.
pub(crate) async fn adjust_balance<C>(
    conn: &C,
    user: &UserId,
    account_id: i64,
    delta: Money,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Account::update_many()
        .col_expr(
            account::Column::BalanceCents,
            Expr::col(account::Column::BalanceCents).add(delta.cents()),
        )
        .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(account::Column::Id.eq(account_id))
        .filter(account::Column::UserId.eq(user.as_str()))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::AccountNotFound { id: account_id });
    }
    debug!(account_id, %delta, "Balance adjusted");
    Ok(())
}
