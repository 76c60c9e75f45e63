//! Listing facade over transactions.
//!
//! Searching, sorting and paging are pure projections over [`TransactionView`]s that were
//! already scoped to one user by [`list_transactions`]. Nothing here touches balances.

use crate::{
    config::app::LedgerSettings,
    core::{
        identity::UserId,
        transaction::{TransactionFilter, list_transactions},
    },
    entities::TransactionType,
    errors::{Error, Result},
    models::TransactionView,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// Column to sort by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Occurrence date
    #[default]
    Date,
    /// Category tag
    Category,
    /// Amount magnitude
    Amount,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    Asc,
    /// Largest first
    #[default]
    Desc,
}

/// Search, filter, sort and page selection for one listing request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransactionQuery {
    /// Case-insensitive substring matched against the description
    pub search: Option<String>,
    /// Only expenses or only income
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    /// Exact category
    pub category: Option<String>,
    /// Only recurring or only one-off transactions
    pub recurring: Option<bool>,
    /// Sort column
    pub sort: SortField,
    /// Sort direction
    pub direction: SortDirection,
    /// 1-indexed page number
    pub page: usize,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            search: None,
            kind: None,
            category: None,
            recurring: None,
            sort: SortField::default(),
            direction: SortDirection::default(),
            page: 1,
        }
    }
}

impl TransactionQuery {
    fn matches(&self, transaction: &TransactionView) -> bool {
        if let Some(needle) = self.search.as_deref().map(str::trim)
            && !needle.is_empty()
        {
            let needle = needle.to_lowercase();
            let found = transaction
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }
        self.kind.is_none_or(|kind| transaction.kind == kind)
            && self
                .category
                .as_deref()
                .is_none_or(|category| transaction.category == category)
            && self
                .recurring
                .is_none_or(|recurring| transaction.is_recurring == recurring)
    }

    fn compare(&self, a: &TransactionView, b: &TransactionView) -> Ordering {
        let ordering = match self.sort {
            SortField::Date => a.date.cmp(&b.date),
            SortField::Category => a.category.cmp(&b.category),
            SortField::Amount => a.amount.cmp(&b.amount),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionPage {
    /// Transactions on this page
    pub items: Vec<TransactionView>,
    /// 1-indexed page number
    pub page: usize,
    /// Number of non-empty pages
    pub total_pages: usize,
    /// Matching transactions across all pages
    pub total_items: usize,
}

fn check_page(page: usize, page_size: usize) -> Result<()> {
    if page == 0 {
        return Err(Error::validation("Page numbers start at 1"));
    }
    if page_size == 0 {
        return Err(Error::validation("Page size must be at least 1"));
    }
    Ok(())
}

/// Filters, sorts and pages `rows` according to `query`.
///
/// Rows that compare equal on the sort column keep id order. A page past the end is empty.
///
/// # Errors
/// [`Error::Validation`] for page 0 or a zero page size.
pub fn paginate(
    mut rows: Vec<TransactionView>,
    query: &TransactionQuery,
    page_size: usize,
) -> Result<TransactionPage> {
    check_page(query.page, page_size)?;

    rows.retain(|t| query.matches(t));
    rows.sort_by_key(|t| t.id);
    rows.sort_by(|a, b| query.compare(a, b));

    let total_items = rows.len();
    let items = rows
        .into_iter()
        .skip((query.page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect();

    Ok(TransactionPage {
        items,
        page: query.page,
        total_pages: total_items.div_ceil(page_size),
        total_items,
    })
}

/// Lists the caller's transactions and returns one page of them, sized by the
/// configured `[ledger] page_size`.
#[instrument(skip(db, filter, query, settings), fields(user = %user, page = query.page))]
pub async fn browse_transactions(
    db: &DatabaseConnection,
    user: &UserId,
    filter: &TransactionFilter,
    query: &TransactionQuery,
    settings: &LedgerSettings,
) -> Result<TransactionPage> {
    check_page(query.page, settings.page_size)?;
    let rows = list_transactions(db, user, filter).await?;
    let page = paginate(rows, query, settings.page_size)?;
    debug!(
        total_items = page.total_items,
        returned = page.items.len(),
        "Transaction page built"
    );
    Ok(page)
}
