//! Receipt drafts.
//!
//! Receipt extraction happens outside this crate. Whatever it produces is treated as an
//! untrusted candidate: it is turned into an ordinary [`TransactionDraft`] and goes through
//! the same validation as any other create request.

use crate::{
    entities::TransactionType,
    errors::{Error, Result},
    models::TransactionDraft,
};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Category used when the extractor suggests none.
pub const FALLBACK_CATEGORY: &str = "other-expense";

/// Fields extracted from a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDraft {
    /// Total amount
    pub amount: Decimal,
    /// Purchase date, `YYYY-MM-DD` or RFC 3339
    pub date: String,
    /// Summary of the items bought
    #[serde(default)]
    pub description: Option<String>,
    /// Merchant or store name
    #[serde(default)]
    pub merchant_name: Option<String>,
    /// Suggested category
    #[serde(default)]
    pub category: Option<String>,
}

impl ReceiptDraft {
    /// Builds a one-off expense draft against `account_id`.
    ///
    /// A missing description falls back to the merchant name, and a missing category to
    /// [`FALLBACK_CATEGORY`].
    ///
    /// # Errors
    /// [`Error::Validation`] if the date is not an ISO-8601 date or timestamp.
    pub fn into_draft(self, account_id: i64) -> Result<TransactionDraft> {
        let date = parse_receipt_date(&self.date)?;
        let description = non_blank(self.description).or_else(|| non_blank(self.merchant_name));
        let category =
            non_blank(self.category).unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

        Ok(TransactionDraft {
            account_id,
            kind: TransactionType::Expense,
            amount: self.amount.to_string(),
            date,
            description,
            category,
            is_recurring: false,
            recurring_interval: None,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_receipt_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|_| Error::validation(format!("Receipt date '{raw}' is not an ISO-8601 date")))
}
