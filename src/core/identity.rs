//! Caller identity.
//!
//! Authentication happens outside this crate. Every ledger operation takes a [`UserId`],
//! and the only way to get one is from an identity the collaborator vouched for.

use crate::errors::{Error, Result};
use std::fmt;

/// Opaque id of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Accepts the identity supplied by the authentication layer.
    ///
    /// A missing or blank identity is [`Error::Unauthorized`].
    pub fn from_identity(identity: Option<&str>) -> Result<Self> {
        match identity.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(Self(id.to_string())),
            _ => Err(Error::Unauthorized),
        }
    }

    /// The id as stored in `user_id` columns.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
