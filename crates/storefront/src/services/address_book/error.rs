//! Address book error types.

use thiserror::Error;

use storekeep_core::{AccountError, UserId};

use crate::db::RepositoryError;

/// Errors that can occur during address book operations.
#[derive(Debug, Error)]
pub enum AddressBookError {
    /// User not found.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// The operation violated an address book rule.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for AddressBookError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}
