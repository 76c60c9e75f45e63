//! Transaction business logic - The ledger transaction manager.
//!
//! Creates, updates and deletes transactions. Every operation writes the transaction rows
//! and the owning account balances inside one database transaction, so either both land
//! or neither does. Balances only ever move through [`account::adjust_balance`]
//! increments computed by the balance delta engine, never by writing absolute values.
//! All operations are scoped to the calling user; other users' rows are reported as not
//! found.

use crate::{
    core::{
        account,
        balance::{BalanceAdjustments, Posting},
        identity::UserId,
        money::Money,
        recurrence::resolve_next_occurrence,
        retry::retry_on_conflict,
    },
    entities::{RecurringInterval, Transaction, TransactionType, transaction},
    errors::{Error, Result},
    models::{BulkDeleteOutcome, TransactionDraft, TransactionView},
};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, QueryTrait, Set, TransactionTrait, prelude::*};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

/// Equality and range filters for [`list_transactions`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only this account
    pub account_id: Option<i64>,
    /// Only this category
    pub category: Option<String>,
    /// Only expenses or only income
    pub kind: Option<TransactionType>,
    /// Only recurring or only one-off transactions
    pub is_recurring: Option<bool>,
    /// Earliest date, inclusive
    pub date_from: Option<NaiveDate>,
    /// Latest date, inclusive
    pub date_to: Option<NaiveDate>,
}

/// A draft that passed validation, with its next occurrence resolved.
#[derive(Debug, Clone)]
struct Entry {
    account_id: i64,
    kind: TransactionType,
    amount: Money,
    date: NaiveDate,
    description: Option<String>,
    category: String,
    is_recurring: bool,
    recurring_interval: Option<RecurringInterval>,
    next_recurring_date: Option<NaiveDate>,
}

impl Entry {
    fn from_draft(draft: &TransactionDraft) -> Result<Self> {
        let amount = Money::parse_magnitude(&draft.amount)?;

        let category = draft.category.trim();
        if category.is_empty() {
            return Err(Error::validation("Category is required"));
        }

        if draft.is_recurring && draft.recurring_interval.is_none() {
            return Err(Error::validation(
                "Recurring transactions need a recurring interval",
            ));
        }
        let recurring_interval = draft.recurring_interval.filter(|_| draft.is_recurring);
        let next_recurring_date =
            resolve_next_occurrence(draft.is_recurring, recurring_interval, draft.date)?;

        let description = draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Self {
            account_id: draft.account_id,
            kind: draft.kind,
            amount,
            date: draft.date,
            description,
            category: category.to_string(),
            is_recurring: draft.is_recurring,
            recurring_interval,
            next_recurring_date,
        })
    }

    fn posting(&self) -> Posting {
        Posting {
            account_id: self.account_id,
            kind: self.kind,
            amount: self.amount,
        }
    }
}

/// Records a new transaction and applies its signed effect to the account balance.
///
/// # Errors
/// * [`Error::Validation`] - amount not a non-negative decimal, blank category, or
///   recurring without an interval
/// * [`Error::AccountNotFound`] - the account does not exist or is not the caller's
#[instrument(skip(db, draft), fields(user = %user, account_id = draft.account_id))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    user: &UserId,
    draft: &TransactionDraft,
) -> Result<TransactionView> {
    let entry = Entry::from_draft(draft)?;
    let created =
        retry_on_conflict("create_transaction", || insert_transaction(db, user, &entry)).await?;
    info!(
        transaction_id = created.id,
        amount = %entry.amount,
        kind = ?entry.kind,
        "Transaction recorded"
    );
    Ok(created.into())
}

async fn insert_transaction(
    db: &DatabaseConnection,
    user: &UserId,
    entry: &Entry,
) -> Result<transaction::Model> {
    let txn = db.begin().await?;

    // The increment is the first statement: it takes the write lock and doubles as the
    // ownership check, failing with AccountNotFound when no row of the caller's matches.
    account::adjust_balance(&txn, user, entry.account_id, entry.posting().effect()).await?;

    let now = Utc::now();
    let created = transaction::ActiveModel {
        user_id: Set(user.as_str().to_string()),
        account_id: Set(entry.account_id),
        kind: Set(entry.kind),
        amount_cents: Set(entry.amount.cents()),
        date: Set(entry.date),
        description: Set(entry.description.clone()),
        category: Set(entry.category.clone()),
        is_recurring: Set(entry.is_recurring),
        recurring_interval: Set(entry.recurring_interval),
        next_recurring_date: Set(entry.next_recurring_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(created)
}

/// Retrieves one of the caller's transactions.
pub async fn get_transaction(
    db: &DatabaseConnection,
    user: &UserId,
    transaction_id: i64,
) -> Result<TransactionView> {
    find_owned_transaction(db, user, transaction_id)
        .await
        .map(Into::into)
}

/// Rewrites a transaction and moves balances by the difference.
///
/// If the draft names a different account, the old account loses the old effect and the
/// new account gains the new one, both in the same database transaction.
///
/// # Errors
/// * [`Error::TransactionNotFound`] - the id is not one of the caller's transactions
/// * [`Error::AccountNotFound`] - the new account is not the caller's
/// * [`Error::Validation`] - as for [`create_transaction`]
#[instrument(skip(db, draft), fields(user = %user))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    user: &UserId,
    transaction_id: i64,
    draft: &TransactionDraft,
) -> Result<TransactionView> {
    let entry = Entry::from_draft(draft)?;
    let updated = retry_on_conflict("update_transaction", || {
        rewrite_transaction(db, user, transaction_id, &entry)
    })
    .await?;
    info!(transaction_id, "Transaction updated");
    Ok(updated.into())
}

async fn rewrite_transaction(
    db: &DatabaseConnection,
    user: &UserId,
    transaction_id: i64,
    entry: &Entry,
) -> Result<transaction::Model> {
    let txn = db.begin().await?;

    lock_transactions(&txn, user, [transaction_id]).await?;
    let existing = find_owned_transaction(&txn, user, transaction_id).await?;
    if existing.account_id != entry.account_id {
        account::find_owned_account(&txn, user, entry.account_id).await?;
        debug!(
            from = existing.account_id,
            to = entry.account_id,
            "Transaction moves to another account"
        );
    }
    let adjustments = BalanceAdjustments::for_update(Posting::from(&existing), entry.posting());

    let mut active: transaction::ActiveModel = existing.into();
    active.account_id = Set(entry.account_id);
    active.kind = Set(entry.kind);
    active.amount_cents = Set(entry.amount.cents());
    active.date = Set(entry.date);
    active.description = Set(entry.description.clone());
    active.category = Set(entry.category.clone());
    active.is_recurring = Set(entry.is_recurring);
    active.recurring_interval = Set(entry.recurring_interval);
    active.next_recurring_date = Set(entry.next_recurring_date);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    apply_adjustments(&txn, user, &adjustments).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Deletes a transaction and reverses its effect on the account balance.
#[instrument(skip(db), fields(user = %user))]
pub async fn delete_transaction(
    db: &DatabaseConnection,
    user: &UserId,
    transaction_id: i64,
) -> Result<TransactionView> {
    let ids = [transaction_id];
    let (mut removed, _) =
        retry_on_conflict("delete_transaction", || remove_transactions(db, user, &ids)).await?;
    info!(transaction_id, "Transaction deleted");
    removed
        .pop()
        .map(Into::into)
        .ok_or(Error::TransactionNotFound { id: transaction_id })
}

/// Deletes several transactions as one all-or-nothing unit.
///
/// Reversals are aggregated so each touched account moves once by the net amount.
/// Duplicate ids count once and an empty list is a no-op. If any id is not one of the
/// caller's transactions the whole batch fails with [`Error::TransactionNotFound`] and
/// nothing changes.
#[instrument(skip(db, transaction_ids), fields(user = %user, count = transaction_ids.len()))]
pub async fn bulk_delete_transactions(
    db: &DatabaseConnection,
    user: &UserId,
    transaction_ids: &[i64],
) -> Result<BulkDeleteOutcome> {
    if transaction_ids.is_empty() {
        return Ok(BulkDeleteOutcome {
            deleted: 0,
            balance_changes: Vec::new(),
        });
    }

    let (removed, adjustments) = retry_on_conflict("bulk_delete_transactions", || {
        remove_transactions(db, user, transaction_ids)
    })
    .await?;

    info!(deleted = removed.len(), "Transactions deleted");
    Ok(BulkDeleteOutcome {
        deleted: removed.len(),
        balance_changes: adjustments
            .iter()
            .map(|(account_id, delta)| (account_id, delta.to_decimal()))
            .collect(),
    })
}

async fn remove_transactions(
    db: &DatabaseConnection,
    user: &UserId,
    transaction_ids: &[i64],
) -> Result<(Vec<transaction::Model>, BalanceAdjustments)> {
    let ids: BTreeSet<i64> = transaction_ids.iter().copied().collect();
    let txn = db.begin().await?;

    lock_transactions(&txn, user, ids.iter().copied()).await?;
    let found = Transaction::find()
        .filter(transaction::Column::UserId.eq(user.as_str()))
        .filter(transaction::Column::Id.is_in(ids.iter().copied()))
        .all(&txn)
        .await?;
    if let Some(missing) = ids
        .iter()
        .copied()
        .find(|id| !found.iter().any(|t| t.id == *id))
    {
        return Err(Error::TransactionNotFound { id: missing });
    }

    let adjustments = BalanceAdjustments::for_removal(found.iter().map(Posting::from));

    Transaction::delete_many()
        .filter(transaction::Column::UserId.eq(user.as_str()))
        .filter(transaction::Column::Id.is_in(ids.iter().copied()))
        .exec(&txn)
        .await?;

    apply_adjustments(&txn, user, &adjustments).await?;

    txn.commit().await?;
    Ok((found, adjustments))
}

/// The caller's transactions matching `filter`, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    user: &UserId,
    filter: &TransactionFilter,
) -> Result<Vec<TransactionView>> {
    let rows = Transaction::find()
        .filter(transaction::Column::UserId.eq(user.as_str()))
        .apply_if(filter.account_id, |q, id| {
            q.filter(transaction::Column::AccountId.eq(id))
        })
        .apply_if(filter.category.as_deref(), |q, category| {
            q.filter(transaction::Column::Category.eq(category))
        })
        .apply_if(filter.kind, |q, kind| {
            q.filter(transaction::Column::Kind.eq(kind))
        })
        .apply_if(filter.is_recurring, |q, recurring| {
            q.filter(transaction::Column::IsRecurring.eq(recurring))
        })
        .apply_if(filter.date_from, |q, from| {
            q.filter(transaction::Column::Date.gte(from))
        })
        .apply_if(filter.date_to, |q, to| {
            q.filter(transaction::Column::Date.lte(to))
        })
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

async fn find_owned_transaction<C>(
    conn: &C,
    user: &UserId,
    transaction_id: i64,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user.as_str()))
        .one(conn)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })
}

/// Takes the store's write lock before a unit's first read, with an update that changes
/// nothing. A deferred unit that reads first cannot wait for the lock when it later writes.
async fn lock_transactions<C, I>(conn: &C, user: &UserId, transaction_ids: I) -> Result<()>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = i64>,
{
    Transaction::update_many()
        .col_expr(transaction::Column::Id, Expr::col(transaction::Column::Id).into())
        .filter(transaction::Column::UserId.eq(user.as_str()))
        .filter(transaction::Column::Id.is_in(transaction_ids))
        .exec(conn)
        .await?;
    Ok(())
}

async fn apply_adjustments<C>(
    conn: &C,
    user: &UserId,
    adjustments: &BalanceAdjustments,
) -> Result<()>
where
    C: ConnectionTrait,
{
    for (account_id, delta) in adjustments.iter() {
        account::adjust_balance(conn, user, account_id, delta).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::account::{get_account, set_default_account};
    use crate::core::report::reconcile_balances;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    async fn balance_of(db: &DatabaseConnection, user: &UserId, account_id: i64) -> Decimal {
        get_account(db, user, account_id).await.unwrap().balance
    }

    #[tokio::test]
    async fn test_create_transaction_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let user = test_user("alice");

        let mut draft = draft(1, TransactionType::Expense, "-5.00");
        let result = create_transaction(&db, &user, &draft).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        draft.amount = "five".to_string();
        let result = create_transaction(&db, &user, &draft).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        draft.amount = "5.00".to_string();
        draft.category = "  ".to_string();
        let result = create_transaction(&db, &user, &draft).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        draft.category = "food".to_string();
        draft.is_recurring = true;
        draft.recurring_interval = None;
        let result = create_transaction(&db, &user, &draft).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_transaction_account_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = test_user("alice");
        let bob = test_user("bob");
        let bobs = create_test_account(&db, &bob, "Checking", "0").await?;

        let result =
            create_transaction(&db, &alice, &draft(bobs.id, TransactionType::Income, "1")).await;
        assert!(matches!(result, Err(Error::AccountNotFound { id }) if id == bobs.id));

        let result =
            create_transaction(&db, &alice, &draft(999, TransactionType::Income, "1")).await;
        assert!(matches!(result, Err(Error::AccountNotFound { id: 999 })));

        assert_eq!(balance_of(&db, &bob, bobs.id).await, dec("0.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_income_delete_scenario() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let account = create_test_account(&db, &user, "Checking", "100.00").await?;

        let expense = create_transaction(
            &db,
            &user,
            &draft(account.id, TransactionType::Expense, "30.00"),
        )
        .await?;
        assert_eq!(balance_of(&db, &user, account.id).await, dec("70.00"));

        update_transaction(
            &db,
            &user,
            expense.id,
            &draft(account.id, TransactionType::Income, "30.00"),
        )
        .await?;
        assert_eq!(balance_of(&db, &user, account.id).await, dec("130.00"));

        delete_transaction(&db, &user, expense.id).await?;
        assert_eq!(balance_of(&db, &user, account.id).await, dec("100.00"));

        assert!(reconcile_balances(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let account = create_test_account(&db, &user, "Checking", "0").await?;

        let mut request = draft(account.id, TransactionType::Expense, "19.99");
        request.date = day(2024, 1, 31);
        request.description = Some("  Gym membership ".to_string());
        request.category = "health".to_string();
        request.is_recurring = true;
        request.recurring_interval = Some(RecurringInterval::Monthly);

        let created = create_transaction(&db, &user, &request).await?;
        let fetched = get_transaction(&db, &user, created.id).await?;

        assert_eq!(fetched, created);
        assert_eq!(fetched.account_id, account.id);
        assert_eq!(fetched.kind, TransactionType::Expense);
        assert_eq!(fetched.amount, dec("19.99"));
        assert_eq!(fetched.date, day(2024, 1, 31));
        assert_eq!(fetched.description.as_deref(), Some("Gym membership"));
        assert_eq!(fetched.category, "health");
        assert!(fetched.is_recurring);
        assert_eq!(fetched.recurring_interval, Some(RecurringInterval::Monthly));
        assert_eq!(fetched.next_recurring_date, Some(day(2024, 2, 29)));
        Ok(())
    }

    #[tokio::test]
    async fn test_one_off_transaction_has_no_next_date() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let account = create_test_account(&db, &user, "Checking", "0").await?;

        let mut request = draft(account.id, TransactionType::Income, "10");
        request.recurring_interval = Some(RecurringInterval::Weekly);
        let created = create_transaction(&db, &user, &request).await?;

        assert!(!created.is_recurring);
        assert_eq!(created.recurring_interval, None);
        assert_eq!(created.next_recurring_date, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_recomputes_next_occurrence() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let account = create_test_account(&db, &user, "Checking", "0").await?;

        let mut request = draft(account.id, TransactionType::Expense, "8");
        request.date = day(2024, 3, 1);
        request.is_recurring = true;
        request.recurring_interval = Some(RecurringInterval::Weekly);
        let created = create_transaction(&db, &user, &request).await?;
        assert_eq!(created.next_recurring_date, Some(day(2024, 3, 8)));

        request.recurring_interval = Some(RecurringInterval::Yearly);
        let updated = update_transaction(&db, &user, created.id, &request).await?;
        assert_eq!(updated.next_recurring_date, Some(day(2025, 3, 1)));

        request.is_recurring = false;
        let updated = update_transaction(&db, &user, created.id, &request).await?;
        assert_eq!(updated.recurring_interval, None);
        assert_eq!(updated.next_recurring_date, None);

        assert_eq!(balance_of(&db, &user, account.id).await, dec("-8.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_reassignment_moves_both_balances() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let checking = create_test_account(&db, &user, "Checking", "100.00").await?;
        let savings = create_test_account(&db, &user, "Savings", "50.00").await?;

        let expense = create_transaction(
            &db,
            &user,
            &draft(checking.id, TransactionType::Expense, "20.00"),
        )
        .await?;
        assert_eq!(balance_of(&db, &user, checking.id).await, dec("80.00"));

        let moved = update_transaction(
            &db,
            &user,
            expense.id,
            &draft(savings.id, TransactionType::Expense, "25.00"),
        )
        .await?;

        assert_eq!(moved.account_id, savings.id);
        assert_eq!(balance_of(&db, &user, checking.id).await, dec("100.00"));
        assert_eq!(balance_of(&db, &user, savings.id).await, dec("25.00"));
        assert!(reconcile_balances(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_to_foreign_account_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = test_user("alice");
        let bob = test_user("bob");
        let checking = create_test_account(&db, &alice, "Checking", "0").await?;
        let bobs = create_test_account(&db, &bob, "Checking", "0").await?;

        let tx = create_test_transaction(&db, &alice, checking.id, TransactionType::Income, "5")
            .await?;
        let result = update_transaction(
            &db,
            &alice,
            tx.id,
            &draft(bobs.id, TransactionType::Income, "500"),
        )
        .await;

        assert!(matches!(result, Err(Error::AccountNotFound { .. })));
        assert_eq!(get_transaction(&db, &alice, tx.id).await?, tx);
        assert_eq!(balance_of(&db, &alice, checking.id).await, dec("5.00"));
        assert_eq!(balance_of(&db, &bob, bobs.id).await, dec("0.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_other_users_transactions_are_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = test_user("alice");
        let bob = test_user("bob");
        let account = create_test_account(&db, &alice, "Checking", "0").await?;
        let tx =
            create_test_transaction(&db, &alice, account.id, TransactionType::Expense, "3").await?;

        assert!(matches!(
            get_transaction(&db, &bob, tx.id).await,
            Err(Error::TransactionNotFound { .. })
        ));
        assert!(matches!(
            update_transaction(&db, &bob, tx.id, &draft(account.id, TransactionType::Income, "1"))
                .await,
            Err(Error::TransactionNotFound { .. })
        ));
        assert!(matches!(
            delete_transaction(&db, &bob, tx.id).await,
            Err(Error::TransactionNotFound { .. })
        ));
        assert_eq!(balance_of(&db, &alice, account.id).await, dec("-3.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_bulk_delete_aggregates_reversal() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let account = create_test_account(&db, &user, "Checking", "25.00").await?;

        let a = create_test_transaction(&db, &user, account.id, TransactionType::Expense, "10")
            .await?;
        let b =
            create_test_transaction(&db, &user, account.id, TransactionType::Income, "5").await?;
        let c = create_test_transaction(&db, &user, account.id, TransactionType::Expense, "20")
            .await?;
        assert_eq!(balance_of(&db, &user, account.id).await, dec("0.00"));

        let outcome = bulk_delete_transactions(&db, &user, &[a.id, b.id, c.id, a.id]).await?;

        assert_eq!(outcome.deleted, 3);
        assert_eq!(outcome.balance_changes, vec![(account.id, dec("25.00"))]);
        assert_eq!(balance_of(&db, &user, account.id).await, dec("25.00"));
        assert!(
            list_transactions(&db, &user, &TransactionFilter::default())
                .await?
                .is_empty()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_bulk_delete_is_all_or_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = test_user("alice");
        let bob = test_user("bob");
        let account = create_test_account(&db, &alice, "Checking", "0").await?;
        let bobs_account = create_test_account(&db, &bob, "Checking", "0").await?;

        let mine =
            create_test_transaction(&db, &alice, account.id, TransactionType::Income, "7").await?;
        let theirs =
            create_test_transaction(&db, &bob, bobs_account.id, TransactionType::Income, "9")
                .await?;

        let result = bulk_delete_transactions(&db, &alice, &[mine.id, theirs.id]).await;
        assert!(matches!(result, Err(Error::TransactionNotFound { id }) if id == theirs.id));

        let result = bulk_delete_transactions(&db, &alice, &[mine.id, 4242]).await;
        assert!(matches!(result, Err(Error::TransactionNotFound { id: 4242 })));

        assert_eq!(get_transaction(&db, &alice, mine.id).await?, mine);
        assert_eq!(balance_of(&db, &alice, account.id).await, dec("7.00"));
        assert_eq!(balance_of(&db, &bob, bobs_account.id).await, dec("9.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_bulk_delete_across_accounts() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let checking = create_test_account(&db, &user, "Checking", "0").await?;
        let savings = create_test_account(&db, &user, "Savings", "0").await?;

        let a = create_test_transaction(&db, &user, checking.id, TransactionType::Expense, "4")
            .await?;
        let b = create_test_transaction(&db, &user, savings.id, TransactionType::Income, "6")
            .await?;
        let keep = create_test_transaction(&db, &user, savings.id, TransactionType::Income, "1")
            .await?;

        bulk_delete_transactions(&db, &user, &[a.id, b.id]).await?;

        assert_eq!(balance_of(&db, &user, checking.id).await, dec("0.00"));
        assert_eq!(balance_of(&db, &user, savings.id).await, dec("1.00"));
        assert!(get_transaction(&db, &user, keep.id).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_bulk_delete_is_noop() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let outcome = bulk_delete_transactions(&db, &test_user("alice"), &[]).await?;
        assert_eq!(outcome.deleted, 0);
        assert!(outcome.balance_changes.is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_lose_no_updates() -> Result<()> {
        const N: i64 = 50;
        let (_dir, db) = setup_file_db(5).await?;
        let db = Arc::new(db);
        let user = test_user("alice");
        let account = create_test_account(&db, &user, "Checking", "0").await?;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..N {
            let db = Arc::clone(&db);
            let user = user.clone();
            let request = draft(account.id, TransactionType::Income, "12.34");
            tasks.spawn(async move { create_transaction(&db, &user, &request).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap()?;
        }

        let expected = dec("12.34") * Decimal::from(N);
        assert_eq!(balance_of(&db, &user, account.id).await, expected);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_and_deletes_stay_consistent() -> Result<()> {
        let (_dir, db) = setup_file_db(5).await?;
        let db = Arc::new(db);
        let user = test_user("alice");
        let checking = create_test_account(&db, &user, "Checking", "100.00").await?;
        let savings = create_test_account(&db, &user, "Savings", "0").await?;

        let mut ids = Vec::new();
        for _ in 0..20 {
            let tx = create_test_transaction(&db, &user, checking.id, TransactionType::Expense, "1")
                .await?;
            ids.push(tx.id);
        }

        let savings_id = savings.id;
        let mut tasks = tokio::task::JoinSet::new();
        for (i, id) in ids.iter().copied().enumerate() {
            let db = Arc::clone(&db);
            let user = user.clone();
            tasks.spawn(async move {
                if i % 2 == 0 {
                    delete_transaction(&db, &user, id).await.map(|_| ())
                } else {
                    let request = draft(savings_id, TransactionType::Income, "2");
                    update_transaction(&db, &user, id, &request).await.map(|_| ())
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap()?;
        }

        assert_eq!(balance_of(&db, &user, checking.id).await, dec("100.00"));
        assert_eq!(balance_of(&db, &user, savings.id).await, dec("20.00"));
        assert!(reconcile_balances(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_largest_amounts_flip_without_overflow() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let account = create_test_account(&db, &user, "Checking", "0").await?;

        let largest = "10000000000000.00";
        let tx =
            create_test_transaction(&db, &user, account.id, TransactionType::Expense, largest)
                .await?;
        update_transaction(
            &db,
            &user,
            tx.id,
            &draft(account.id, TransactionType::Income, largest),
        )
        .await?;
        assert_eq!(balance_of(&db, &user, account.id).await, dec(largest));

        let too_large = draft(account.id, TransactionType::Income, "92233720368547758.07");
        let result = update_transaction(&db, &user, tx.id, &too_large).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(balance_of(&db, &user, account.id).await, dec(largest));
        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_stays_consistent_over_mixed_operations() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let checking = create_test_account(&db, &user, "Checking", "1000.00").await?;
        let savings = create_test_account(&db, &user, "Savings", "0").await?;
        set_default_account(&db, &user, savings.id).await?;

        let mut ids = Vec::new();
        for (i, amount) in ["0.10", "0.20", "99.99", "0.01", "12.00"].iter().enumerate() {
            let kind = if i % 2 == 0 {
                TransactionType::Expense
            } else {
                TransactionType::Income
            };
            let account_id = if i % 3 == 0 { checking.id } else { savings.id };
            ids.push(create_test_transaction(&db, &user, account_id, kind, amount).await?.id);
        }
        update_transaction(
            &db,
            &user,
            ids[0],
            &draft(savings.id, TransactionType::Income, "0.30"),
        )
        .await?;
        delete_transaction(&db, &user, ids[2]).await?;
        bulk_delete_transactions(&db, &user, &[ids[3], ids[4]]).await?;

        assert!(reconcile_balances(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_transactions_filters_and_order() -> Result<()> {
        let db = setup_test_db().await?;
        let user = test_user("alice");
        let checking = create_test_account(&db, &user, "Checking", "0").await?;
        let savings = create_test_account(&db, &user, "Savings", "0").await?;

        let mut request = draft(checking.id, TransactionType::Expense, "5");
        request.date = day(2024, 1, 10);
        request.category = "food".to_string();
        let jan = create_transaction(&db, &user, &request).await?;

        request.date = day(2024, 2, 10);
        request.is_recurring = true;
        request.recurring_interval = Some(RecurringInterval::Monthly);
        let feb = create_transaction(&db, &user, &request).await?;

        let mut income = draft(savings.id, TransactionType::Income, "100");
        income.date = day(2024, 2, 1);
        income.category = "salary".to_string();
        let salary = create_transaction(&db, &user, &income).await?;

        create_test_transaction(
            &db,
            &test_user("bob"),
            create_test_account(&db, &test_user("bob"), "B", "0").await?.id,
            TransactionType::Expense,
            "1",
        )
        .await?;

        let all = list_transactions(&db, &user, &TransactionFilter::default()).await?;
        let ids: Vec<i64> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![feb.id, salary.id, jan.id]);

        let food = TransactionFilter {
            category: Some("food".to_string()),
            ..Default::default()
        };
        assert_eq!(list_transactions(&db, &user, &food).await?.len(), 2);

        let only_income = TransactionFilter {
            kind: Some(TransactionType::Income),
            ..Default::default()
        };
        assert_eq!(list_transactions(&db, &user, &only_income).await?, vec![salary]);

        let recurring = TransactionFilter {
            is_recurring: Some(true),
            account_id: Some(checking.id),
            ..Default::default()
        };
        assert_eq!(list_transactions(&db, &user, &recurring).await?, vec![feb]);

        let january = TransactionFilter {
            date_from: Some(day(2024, 1, 1)),
            date_to: Some(day(2024, 1, 31)),
            ..Default::default()
        };
        assert_eq!(list_transactions(&db, &user, &january).await?, vec![jan]);
        Ok(())
    }
}
