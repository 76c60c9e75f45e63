//! Single retry for transient store conflicts.

use crate::errors::{Error, Result};
use std::future::Future;
use tracing::warn;

/// Runs `attempt`, and runs it once more if the store reported [`Error::Conflict`].
///
/// Every attempt must be a complete atomic unit so that repeating it is safe.
pub(crate) async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match attempt().await {
        Err(Error::Conflict { message }) => {
            warn!(operation, %message, "Store reported a conflict, retrying once");
            attempt().await
        }
        result => result,
    }
}
