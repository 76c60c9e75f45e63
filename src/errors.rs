//! Unified error type for the ledger engine.
//!
//! Every failure is surfaced to the caller as a typed variant with a readable message.
//! Store errors are classified on conversion so that transient serialization failures
//! can be told apart from hard failures.

use sea_orm::DbErr;
use thiserror::Error;

/// Errors produced by ledger, account and query operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller did not present an authenticated identity.
    #[error("Unauthorized")]
    Unauthorized,

    /// The account does not exist or is not owned by the caller.
    #[error("Account not found: {id}")]
    AccountNotFound {
        /// Requested account id
        id: i64,
    },

    /// The transaction does not exist or is not owned by the caller.
    #[error("Transaction not found: {id}")]
    TransactionNotFound {
        /// Requested transaction id
        id: i64,
    },

    /// Malformed input: bad amount, missing field, invalid value.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// The store rejected a concurrent write; safe to retry.
    #[error("Conflicting concurrent update: {message}")]
    Conflict {
        /// Store message
        message: String,
    },

    /// The store could not be reached in time.
    #[error("Dependency unavailable: {message}")]
    Dependency {
        /// Store or collaborator message
        message: String,
    },

    /// Any other store failure.
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// True for the not-found class (account or transaction).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound { .. } | Self::TransactionNotFound { .. }
        )
    }

    /// True when the caller may retry the same operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Dependency { .. })
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Self::Dependency {
                message: err.to_string(),
            },
            err if is_serialization_failure(&err) => Self::Conflict {
                message: err.to_string(),
            },
            err => Self::Database(err),
        }
    }
}

/// SQLite reports lock contention and unique index violations only through the message.
fn is_serialization_failure(err: &DbErr) -> bool {
    let message = err.to_string().to_lowercase();
    [
        "database is locked",
        "database table is locked",
        "sqlite_busy",
        "unique constraint failed",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
