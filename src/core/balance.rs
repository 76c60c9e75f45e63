//! Balance deltas.
//!
//! Pure arithmetic describing how transactions move account balances. The ledger
//! manager turns the resulting [`BalanceAdjustments`] into atomic increments.

use crate::{
    core::money::Money,
    entities::{TransactionModel, TransactionType},
};
use std::collections::BTreeMap;

/// Balance contribution of a transaction: positive for income, negative for expense.
#[must_use]
pub fn signed_effect(kind: TransactionType, amount: Money) -> Money {
    match kind {
        TransactionType::Income => amount,
        TransactionType::Expense => -amount,
    }
}

/// Change in balance when a transaction on the same account is edited.
#[must_use]
pub fn net_delta(old: Posting, new: Posting) -> Money {
    new.effect() - old.effect()
}

/// Change in balance when a transaction is removed.
#[must_use]
pub fn reversal(existing: Posting) -> Money {
    -existing.effect()
}

/// The part of a transaction that matters to balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// Account the amount is booked against
    pub account_id: i64,
    /// Expense or income
    pub kind: TransactionType,
    /// Non-negative magnitude
    pub amount: Money,
}

impl Posting {
    /// Signed effect on the account.
    #[must_use]
    pub fn effect(self) -> Money {
        signed_effect(self.kind, self.amount)
    }
}

impl From<&TransactionModel> for Posting {
    fn from(model: &TransactionModel) -> Self {
        Self {
            account_id: model.account_id,
            kind: model.kind,
            amount: Money::from_cents(model.amount_cents),
        }
    }
}

/// Net balance change per account for one atomic unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceAdjustments(BTreeMap<i64, Money>);

impl BalanceAdjustments {
    /// Adds `delta` to whatever is already pending for `account_id`.
    pub fn record(&mut self, account_id: i64, delta: Money) {
        *self.0.entry(account_id).or_default() += delta;
    }

    /// Adjustments for rewriting `old` as `new`.
    ///
    /// When the account changes, the old account loses the old effect and the new account
    /// gains the new one. Otherwise the single account moves by the net delta.
    #[must_use]
    pub fn for_update(old: Posting, new: Posting) -> Self {
        let mut adjustments = Self::default();
        if old.account_id == new.account_id {
            adjustments.record(new.account_id, net_delta(old, new));
        } else {
            adjustments.record(old.account_id, reversal(old));
            adjustments.record(new.account_id, new.effect());
        }
        adjustments
    }

    /// Adjustments for removing every posting, aggregated per account.
    #[must_use]
    pub fn for_removal<I: IntoIterator<Item = Posting>>(postings: I) -> Self {
        let mut adjustments = Self::default();
        for posting in postings {
            adjustments.record(posting.account_id, reversal(posting));
        }
        adjustments
    }

    /// Pending delta for one account, zero if none.
    #[must_use]
    pub fn get(&self, account_id: i64) -> Money {
        self.0.get(&account_id).copied().unwrap_or_default()
    }

    /// Non-zero deltas in account id order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, Money)> + '_ {
        self.0
            .iter()
            .filter(|(_, delta)| !delta.is_zero())
            .map(|(account_id, delta)| (*account_id, *delta))
    }
}
