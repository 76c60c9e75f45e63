//! Next-occurrence dates for recurring transactions.
//!
//! Month and year steps clamp to the last day of the target month, so
//! 2024-01-31 + 1 month is 2024-02-29 and 2024-02-29 + 1 year is 2025-02-28.
//! Nothing here runs a clock: an external scheduler reads `next_recurring_date`
//! and records the next occurrence as an ordinary new transaction.

use crate::{
    entities::RecurringInterval,
    errors::{Error, Result},
};
use chrono::{Days, Months, NaiveDate};

/// Returns the first occurrence strictly after `start`.
///
/// Fails only if the result would fall outside chrono's supported date range.
pub fn next_occurrence(start: NaiveDate, interval: RecurringInterval) -> Result<NaiveDate> {
    let next = match interval {
        RecurringInterval::Daily => start.checked_add_days(Days::new(1)),
        RecurringInterval::Weekly => start.checked_add_days(Days::new(7)),
        RecurringInterval::Monthly => start.checked_add_months(Months::new(1)),
        RecurringInterval::Yearly => start.checked_add_months(Months::new(12)),
    };
    next.ok_or_else(|| Error::validation(format!("No {interval:?} occurrence after {start}")))
}

/// Next occurrence for a transaction, present only when it is recurring and has an interval.
pub fn resolve_next_occurrence(
    is_recurring: bool,
    interval: Option<RecurringInterval>,
    date: NaiveDate,
) -> Result<Option<NaiveDate>> {
    match (is_recurring, interval) {
        (true, Some(interval)) => next_occurrence(date, interval).map(Some),
        _ => Ok(None),
    }
}
