//! Core layer - framework-agnostic ledger logic
//!
//! Account registry, ledger transaction manager and the pure building blocks they share.
//! Nothing here knows about transports; callers pass an authenticated [`identity::UserId`]
//! and get back typed views or [`crate::errors::Error`]s.

/// Account registry and the single-default invariant
pub mod account;
/// Balance delta engine
pub mod balance;
/// Caller identity
pub mod identity;
/// Fixed-point money type
pub mod money;
/// Search, sort and pagination over transaction listings
pub mod query;
/// Conversion of extracted receipts into transaction drafts
pub mod receipt;
/// Next-occurrence calculation for recurring transactions
pub mod recurrence;
/// Account summaries and balance reconciliation
pub mod report;
/// Ledger transaction manager
pub mod transaction;

mod retry;
