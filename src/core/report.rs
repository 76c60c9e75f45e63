//! Report generation business logic.
//!
//! Read-only views computed from the transaction history: per-account summaries over a
//! date range, and the reconciliation report that checks every stored balance against
//! the balance its transactions imply.

use crate::{
    core::{account, balance::Posting, identity::UserId, money::Money},
    entities::{Account, AccountColumn, Transaction, TransactionType, transaction},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Income and expense totals for one account over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    /// The account summarized
    pub account_id: i64,
    /// First day included
    pub from: NaiveDate,
    /// Last day included
    pub to: NaiveDate,
    /// Sum of income amounts
    pub income: Decimal,
    /// Sum of expense amounts, as a magnitude
    pub expense: Decimal,
    /// Income minus expense
    pub net: Decimal,
    /// Transactions in the range
    pub transaction_count: usize,
}

/// An account whose stored balance disagrees with its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    /// The drifting account
    pub account_id: i64,
    /// Its owner
    pub user_id: String,
    /// Balance currently stored
    pub stored: Decimal,
    /// Opening balance plus the signed effect of every transaction
    pub expected: Decimal,
}

/// Totals the caller's account between `from` and `to`, both inclusive.
///
/// # Errors
/// * [`Error::Validation`] - `from` is after `to`
/// * [`Error::AccountNotFound`] - the account is not the caller's
#[instrument(skip(db), fields(user = %user))]
pub async fn summarize_account(
    db: &DatabaseConnection,
    user: &UserId,
    account_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<AccountSummary> {
    if from > to {
        return Err(Error::validation(format!(
            "Range start {from} is after range end {to}"
        )));
    }
    account::find_owned_account(db, user, account_id).await?;

    let transactions = Transaction::find()
        .filter(transaction::Column::AccountId.eq(account_id))
        .filter(transaction::Column::UserId.eq(user.as_str()))
        .filter(transaction::Column::Date.between(from, to))
        .all(db)
        .await?;

    let (income, expense) = transactions.iter().map(Posting::from).fold(
        (Money::ZERO, Money::ZERO),
        |(income, expense), posting| match posting.kind {
            TransactionType::Income => (income + posting.amount, expense),
            TransactionType::Expense => (income, expense + posting.amount),
        },
    );

    Ok(AccountSummary {
        account_id,
        from,
        to,
        income: income.to_decimal(),
        expense: expense.to_decimal(),
        net: (income - expense).to_decimal(),
        transaction_count: transactions.len(),
    })
}

/// Recomputes every account's balance from its opening balance and transactions.
///
/// Returns the accounts whose stored balance differs, in id order. An empty result means
/// the ledger is consistent.
#[instrument(skip(db))]
pub async fn reconcile_balances(db: &DatabaseConnection) -> Result<Vec<BalanceDrift>> {
    let accounts = Account::find()
        .order_by_asc(AccountColumn::Id)
        .all(db)
        .await?;
    let transactions = Transaction::find().all(db).await?;

    let mut effects: BTreeMap<i64, Money> = BTreeMap::new();
    for posting in transactions.iter().map(Posting::from) {
        *effects.entry(posting.account_id).or_default() += posting.effect();
    }

    let drifts: Vec<BalanceDrift> = accounts
        .into_iter()
        .filter_map(|account| {
            let stored = Money::from_cents(account.balance_cents);
            let expected = Money::from_cents(account.opening_balance_cents)
                + effects.get(&account.id).copied().unwrap_or_default();
            (stored != expected).then(|| BalanceDrift {
                account_id: account.id,
                user_id: account.user_id,
                stored: stored.to_decimal(),
                expected: expected.to_decimal(),
            })
        })
        .collect();

    if drifts.is_empty() {
        info!(
            transactions = transactions.len(),
            "All account balances match their history"
        );
    } else {
        for drift in &drifts {
            warn!(
                account_id = drift.account_id,
                stored = %drift.stored,
                expected = %drift.expected,
                "Account balance drifted from its history"
            );
        }
    }
    Ok(drifts)
}
