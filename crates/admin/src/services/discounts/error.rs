//! Discount management error types.

use thiserror::Error;

use storekeep_core::{DiscountError, SaleId, VoucherId};

use crate::db::RepositoryError;

/// Errors that can occur during voucher and sale management.
#[derive(Debug, Error)]
pub enum DiscountServiceError {
    /// Voucher not found.
    #[error("voucher {0} not found")]
    VoucherNotFound(VoucherId),

    /// Sale not found.
    #[error("sale {0} not found")]
    SaleNotFound(SaleId),

    /// Another voucher already uses this code.
    #[error("voucher code {0} is already in use")]
    CodeTaken(String),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] DiscountError),

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for DiscountServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}
