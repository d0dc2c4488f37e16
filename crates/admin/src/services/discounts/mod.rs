//! Voucher and sale management.
//!
//! Updates and scope changes lock the discount row, apply the core operation
//! in memory and write back only what changed, inside one transaction.

mod error;

pub use error::DiscountServiceError;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use storekeep_core::{
    CatalogueInput, CatalogueScoped, Sale, SaleId, SaleInput, SaleUpdate, ScopeOp, Voucher,
    VoucherCode, VoucherId, VoucherInput, VoucherUpdate,
};

use crate::db::discounts::{self, DiscountRepository, ScopeOwner};
use crate::db::RepositoryError;

/// Discount management service.
pub struct DiscountService<'a> {
    pool: &'a PgPool,
    discounts: DiscountRepository<'a>,
    voucher_code_length: usize,
}

impl<'a> DiscountService<'a> {
    /// Create a new discount service.
    ///
    /// `voucher_code_length` is the length of codes generated for vouchers
    /// created without one.
    #[must_use]
    pub const fn new(pool: &'a PgPool, voucher_code_length: usize) -> Self {
        Self {
            pool,
            discounts: DiscountRepository::new(pool),
            voucher_code_length,
        }
    }

    // =========================================================================
    // Vouchers
    // =========================================================================

    /// Get a voucher by ID.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::VoucherNotFound` if the voucher doesn't exist.
    pub async fn get_voucher(&self, id: VoucherId) -> Result<Voucher, DiscountServiceError> {
        self.discounts
            .get_voucher(id)
            .await?
            .ok_or(DiscountServiceError::VoucherNotFound(id))
    }

    /// Look up a voucher by code, as typed by a customer.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::Validation` if the code is malformed.
    pub async fn find_voucher_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Voucher>, DiscountServiceError> {
        let code = VoucherCode::parse(code)?;
        Ok(self.discounts.get_voucher_by_code(&code).await?)
    }

    /// Create a voucher, generating a code if none is given.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::Validation` if the input is invalid.
    /// Returns `DiscountServiceError::CodeTaken` if the code is already in use.
    #[instrument(skip_all)]
    pub async fn create_voucher(
        &self,
        input: VoucherInput,
    ) -> Result<Voucher, DiscountServiceError> {
        let new_voucher = input.validate(today(), self.voucher_code_length)?;
        let code = new_voucher.code.to_string();

        let voucher = self
            .discounts
            .create_voucher(new_voucher)
            .await
            .map_err(|e| code_taken(e, code))?;

        info!(voucher_id = %voucher.id, code = %voucher.code, "Voucher created");
        Ok(voucher)
    }

    /// Apply a partial update to a voucher.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::VoucherNotFound` if the voucher doesn't exist.
    /// Returns `DiscountServiceError::Validation` if the updated voucher is invalid.
    /// Returns `DiscountServiceError::CodeTaken` if the new code is already in use.
    #[instrument(skip_all, fields(voucher_id = %id))]
    pub async fn update_voucher(
        &self,
        id: VoucherId,
        update: VoucherUpdate,
    ) -> Result<Voucher, DiscountServiceError> {
        let mut tx = self.pool.begin().await?;
        let mut voucher = discounts::lock_voucher(&mut tx, id)
            .await?
            .ok_or(DiscountServiceError::VoucherNotFound(id))?;

        voucher.apply_update(update)?;
        discounts::save_voucher(&mut tx, &voucher)
            .await
            .map_err(|e| code_taken(e, voucher.code.to_string()))?;
        tx.commit().await?;

        info!("Voucher updated");
        Ok(voucher)
    }

    /// Delete a voucher together with its scope.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::VoucherNotFound` if the voucher doesn't exist.
    #[instrument(skip_all, fields(voucher_id = %id))]
    pub async fn delete_voucher(&self, id: VoucherId) -> Result<(), DiscountServiceError> {
        match self.discounts.delete_voucher(id).await {
            Ok(()) => {
                info!("Voucher deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(DiscountServiceError::VoucherNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Add catalogue entities to a voucher's scope.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::VoucherNotFound` if the voucher doesn't exist.
    pub async fn voucher_catalogues_add(
        &self,
        id: VoucherId,
        input: &CatalogueInput,
    ) -> Result<Voucher, DiscountServiceError> {
        self.change_voucher_scope(id, ScopeOp::Add, input).await
    }

    /// Remove catalogue entities from a voucher's scope.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::VoucherNotFound` if the voucher doesn't exist.
    pub async fn voucher_catalogues_remove(
        &self,
        id: VoucherId,
        input: &CatalogueInput,
    ) -> Result<Voucher, DiscountServiceError> {
        self.change_voucher_scope(id, ScopeOp::Remove, input).await
    }

    #[instrument(skip_all, fields(voucher_id = %id, op = ?op))]
    async fn change_voucher_scope(
        &self,
        id: VoucherId,
        op: ScopeOp,
        input: &CatalogueInput,
    ) -> Result<Voucher, DiscountServiceError> {
        let mut tx = self.pool.begin().await?;
        let mut voucher = discounts::lock_voucher(&mut tx, id)
            .await?
            .ok_or(DiscountServiceError::VoucherNotFound(id))?;

        let delta = voucher.change_catalogues(op, input);
        if delta.is_empty() {
            debug!("Scope unchanged");
            return Ok(voucher);
        }

        discounts::apply_scope_delta(&mut tx, ScopeOwner::Voucher(id), op, &delta).await?;
        tx.commit().await?;

        info!(changed = delta.len(), "Voucher scope updated");
        Ok(voucher)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Get a sale by ID.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::SaleNotFound` if the sale doesn't exist.
    pub async fn get_sale(&self, id: SaleId) -> Result<Sale, DiscountServiceError> {
        self.discounts
            .get_sale(id)
            .await?
            .ok_or(DiscountServiceError::SaleNotFound(id))
    }

    /// Create a sale.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::Validation` if the input is invalid.
    #[instrument(skip_all)]
    pub async fn create_sale(&self, input: SaleInput) -> Result<Sale, DiscountServiceError> {
        let new_sale = input.validate(today())?;
        let sale = self.discounts.create_sale(new_sale).await?;

        info!(sale_id = %sale.id, name = %sale.name, "Sale created");
        Ok(sale)
    }

    /// Apply a partial update to a sale.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::SaleNotFound` if the sale doesn't exist.
    /// Returns `DiscountServiceError::Validation` if the updated sale is invalid.
    #[instrument(skip_all, fields(sale_id = %id))]
    pub async fn update_sale(
        &self,
        id: SaleId,
        update: SaleUpdate,
    ) -> Result<Sale, DiscountServiceError> {
        let mut tx = self.pool.begin().await?;
        let mut sale = discounts::lock_sale(&mut tx, id)
            .await?
            .ok_or(DiscountServiceError::SaleNotFound(id))?;

        sale.apply_update(update)?;
        discounts::save_sale(&mut tx, &sale).await?;
        tx.commit().await?;

        info!("Sale updated");
        Ok(sale)
    }

    /// Delete a sale together with its scope.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::SaleNotFound` if the sale doesn't exist.
    #[instrument(skip_all, fields(sale_id = %id))]
    pub async fn delete_sale(&self, id: SaleId) -> Result<(), DiscountServiceError> {
        match self.discounts.delete_sale(id).await {
            Ok(()) => {
                info!("Sale deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(DiscountServiceError::SaleNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Add catalogue entities to a sale's scope.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::SaleNotFound` if the sale doesn't exist.
    pub async fn sale_catalogues_add(
        &self,
        id: SaleId,
        input: &CatalogueInput,
    ) -> Result<Sale, DiscountServiceError> {
        self.change_sale_scope(id, ScopeOp::Add, input).await
    }

    /// Remove catalogue entities from a sale's scope.
    ///
    /// # Errors
    ///
    /// Returns `DiscountServiceError::SaleNotFound` if the sale doesn't exist.
    pub async fn sale_catalogues_remove(
        &self,
        id: SaleId,
        input: &CatalogueInput,
    ) -> Result<Sale, DiscountServiceError> {
        self.change_sale_scope(id, ScopeOp::Remove, input).await
    }

    #[instrument(skip_all, fields(sale_id = %id, op = ?op))]
    async fn change_sale_scope(
        &self,
        id: SaleId,
        op: ScopeOp,
        input: &CatalogueInput,
    ) -> Result<Sale, DiscountServiceError> {
        let mut tx = self.pool.begin().await?;
        let mut sale = discounts::lock_sale(&mut tx, id)
            .await?
            .ok_or(DiscountServiceError::SaleNotFound(id))?;

        let delta = sale.change_catalogues(op, input);
        if delta.is_empty() {
            debug!("Scope unchanged");
            return Ok(sale);
        }

        discounts::apply_scope_delta(&mut tx, ScopeOwner::Sale(id), op, &delta).await?;
        tx.commit().await?;

        info!(changed = delta.len(), "Sale scope updated");
        Ok(sale)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn code_taken(err: RepositoryError, code: String) -> DiscountServiceError {
    match err {
        RepositoryError::Conflict(_) => DiscountServiceError::CodeTaken(code),
        other => DiscountServiceError::Repository(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_taken_maps_conflicts_only() {
        let err = code_taken(RepositoryError::Conflict("dup".to_owned()), "SPRING".to_owned());
        assert!(matches!(err, DiscountServiceError::CodeTaken(code) if code == "SPRING"));

        let err = code_taken(RepositoryError::NotFound, "SPRING".to_owned());
        assert!(matches!(
            err,
            DiscountServiceError::Repository(RepositoryError::NotFound)
        ));
    }
}
