//! Voucher and sale repository.
//!
//! A discount row and its scope rows are always loaded together. Scope rows
//! live in one join table per (discount kind, catalogue kind) pair, each with a
//! composite primary key, so a scope is a set at the storage layer too.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use storekeep_core::{
    CatalogueScope, CategoryId, CollectionId, DiscountValueType, NewSale, NewVoucher, ProductId,
    Sale, SaleId, ScopeDelta, ScopeOp, Voucher, VoucherCode, VoucherId, VoucherType,
};

use super::RepositoryError;

const VOUCHER_COLUMNS: &str = r"
    id, voucher_type, name, code, usage_limit, used, start_date, end_date,
    discount_value_type, discount_value, min_amount_spent, countries
";

const SALE_COLUMNS: &str = "id, name, value_type, value, start_date, end_date";

#[derive(Debug, sqlx::FromRow)]
struct VoucherRow {
    id: VoucherId,
    voucher_type: VoucherType,
    name: Option<String>,
    code: String,
    usage_limit: Option<i32>,
    used: i32,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    discount_value_type: DiscountValueType,
    discount_value: Decimal,
    min_amount_spent: Option<Decimal>,
    countries: Vec<String>,
}

impl VoucherRow {
    fn into_voucher(self, scope: CatalogueScope) -> Result<Voucher, RepositoryError> {
        let corrupt = |field: &str| {
            RepositoryError::DataCorruption(format!("voucher {} has a negative {field}", self.id))
        };
        let usage_limit = self
            .usage_limit
            .map(u32::try_from)
            .transpose()
            .map_err(|_| corrupt("usage limit"))?;
        let used = u32::try_from(self.used).map_err(|_| corrupt("use count"))?;

        Ok(Voucher {
            id: self.id,
            voucher_type: self.voucher_type,
            name: self.name,
            code: VoucherCode::from_stored(self.code),
            usage_limit,
            used,
            start_date: self.start_date,
            end_date: self.end_date,
            discount_value_type: self.discount_value_type,
            discount_value: self.discount_value,
            min_amount_spent: self.min_amount_spent,
            countries: self.countries,
            scope,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: SaleId,
    name: String,
    value_type: DiscountValueType,
    value: Decimal,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

impl SaleRow {
    fn into_sale(self, scope: CatalogueScope) -> Sale {
        Sale {
            id: self.id,
            name: self.name,
            value_type: self.value_type,
            value: self.value,
            start_date: self.start_date,
            end_date: self.end_date,
            scope,
        }
    }
}

/// The discount a set of scope rows belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOwner {
    Voucher(VoucherId),
    Sale(SaleId),
}

/// Join table names for one discount kind.
struct ScopeTables {
    owner_column: &'static str,
    products: &'static str,
    collections: &'static str,
    categories: &'static str,
}

impl ScopeOwner {
    const fn id(self) -> i32 {
        match self {
            Self::Voucher(id) => id.as_i32(),
            Self::Sale(id) => id.as_i32(),
        }
    }

    const fn tables(self) -> ScopeTables {
        match self {
            Self::Voucher(_) => ScopeTables {
                owner_column: "voucher_id",
                products: "admin.voucher_product",
                collections: "admin.voucher_collection",
                categories: "admin.voucher_category",
            },
            Self::Sale(_) => ScopeTables {
                owner_column: "sale_id",
                products: "admin.sale_product",
                collections: "admin.sale_collection",
                categories: "admin.sale_category",
            },
        }
    }
}

/// Repository for voucher and sale database operations.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    /// Create a new discount repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Vouchers
    // =========================================================================

    /// Get a voucher, with its scope, by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored count is negative.
    pub async fn get_voucher(&self, id: VoucherId) -> Result<Option<Voucher>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {VOUCHER_COLUMNS} FROM admin.voucher WHERE id = $1");
        let row = sqlx::query_as::<_, VoucherRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        load_voucher(&mut *conn, row).await
    }

    /// Get a voucher by its (normalized) code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_voucher_by_code(
        &self,
        code: &VoucherCode,
    ) -> Result<Option<Voucher>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {VOUCHER_COLUMNS} FROM admin.voucher WHERE code = $1");
        let row = sqlx::query_as::<_, VoucherRow>(&sql)
            .bind(code.as_str())
            .fetch_optional(&mut *conn)
            .await?;
        load_voucher(&mut *conn, row).await
    }

    /// Insert a validated voucher together with its initial scope.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_voucher(&self, voucher: NewVoucher) -> Result<Voucher, RepositoryError> {
        let usage_limit = voucher.usage_limit.map(to_db_count).transpose()?;
        let mut tx = self.pool.begin().await?;
        let id: VoucherId = sqlx::query_scalar(
            r"
            INSERT INTO admin.voucher (
                voucher_type, name, code, usage_limit, start_date, end_date,
                discount_value_type, discount_value, min_amount_spent, countries
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(voucher.voucher_type)
        .bind(&voucher.name)
        .bind(voucher.code.as_str())
        .bind(usage_limit)
        .bind(voucher.start_date)
        .bind(voucher.end_date)
        .bind(voucher.discount_value_type)
        .bind(voucher.discount_value)
        .bind(voucher.min_amount_spent)
        .bind(&voucher.countries)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| code_conflict(e, &voucher.code))?;

        apply_scope_delta(&mut tx, ScopeOwner::Voucher(id), ScopeOp::Add, &voucher.scope).await?;
        tx.commit().await?;

        Ok(voucher.into_voucher(id))
    }

    /// Delete a voucher and its scope.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the voucher doesn't exist.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_voucher(&self, id: VoucherId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM admin.voucher WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Get a sale, with its scope, by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {SALE_COLUMNS} FROM admin.sale WHERE id = $1");
        let row = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        load_sale(&mut *conn, row).await
    }

    /// Insert a validated sale with an empty scope.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_sale(&self, sale: NewSale) -> Result<Sale, RepositoryError> {
        let id: SaleId = sqlx::query_scalar(
            r"
            INSERT INTO admin.sale (name, value_type, value, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&sale.name)
        .bind(sale.value_type)
        .bind(sale.value)
        .bind(sale.start_date)
        .bind(sale.end_date)
        .fetch_one(self.pool)
        .await?;

        Ok(sale.into_sale(id))
    }

    /// Delete a sale and its scope.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the sale doesn't exist.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_sale(&self, id: SaleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM admin.sale WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Transactional Operations
// =============================================================================

/// Load a voucher and lock its row until the surrounding transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
/// Returns `RepositoryError::DataCorruption` if a stored count is negative.
pub async fn lock_voucher(
    conn: &mut PgConnection,
    id: VoucherId,
) -> Result<Option<Voucher>, RepositoryError> {
    let sql = format!("SELECT {VOUCHER_COLUMNS} FROM admin.voucher WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, VoucherRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    load_voucher(conn, row).await
}

/// Load a sale and lock its row until the surrounding transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn lock_sale(conn: &mut PgConnection, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM admin.sale WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    load_sale(conn, row).await
}

/// Write back the scalar fields of an updated voucher.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the new code is already taken.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn save_voucher(conn: &mut PgConnection, voucher: &Voucher) -> Result<(), RepositoryError> {
    let usage_limit = voucher.usage_limit.map(to_db_count).transpose()?;
    sqlx::query(
        r"
        UPDATE admin.voucher
        SET voucher_type = $2, name = $3, code = $4, usage_limit = $5, start_date = $6,
            end_date = $7, discount_value_type = $8, discount_value = $9,
            min_amount_spent = $10, countries = $11, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(voucher.id)
    .bind(voucher.voucher_type)
    .bind(&voucher.name)
    .bind(voucher.code.as_str())
    .bind(usage_limit)
    .bind(voucher.start_date)
    .bind(voucher.end_date)
    .bind(voucher.discount_value_type)
    .bind(voucher.discount_value)
    .bind(voucher.min_amount_spent)
    .bind(&voucher.countries)
    .execute(&mut *conn)
    .await
    .map_err(|e| code_conflict(e, &voucher.code))?;
    Ok(())
}

/// Write back the scalar fields of an updated sale.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn save_sale(conn: &mut PgConnection, sale: &Sale) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE admin.sale
        SET name = $2, value_type = $3, value = $4, start_date = $5, end_date = $6,
            updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(sale.id)
    .bind(&sale.name)
    .bind(sale.value_type)
    .bind(sale.value)
    .bind(sale.start_date)
    .bind(sale.end_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Persist a scope change: insert the added rows or delete the removed ones.
///
/// Inserts skip rows that already exist, so replaying a delta is harmless.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn apply_scope_delta(
    conn: &mut PgConnection,
    owner: ScopeOwner,
    op: ScopeOp,
    delta: &ScopeDelta,
) -> Result<(), RepositoryError> {
    let tables = owner.tables();
    let groups = [
        (tables.products, "product_id", ids(&delta.products, ProductId::as_i32)),
        (tables.collections, "collection_id", ids(&delta.collections, CollectionId::as_i32)),
        (tables.categories, "category_id", ids(&delta.categories, CategoryId::as_i32)),
    ];

    for (table, column, values) in groups {
        if values.is_empty() {
            continue;
        }
        let owner_column = tables.owner_column;
        let sql = match op {
            ScopeOp::Add => format!(
                "INSERT INTO {table} ({owner_column}, {column}) \
                 SELECT $1, UNNEST($2::INTEGER[]) \
                 ON CONFLICT DO NOTHING"
            ),
            ScopeOp::Remove => format!(
                "DELETE FROM {table} WHERE {owner_column} = $1 AND {column} = ANY($2)"
            ),
        };
        sqlx::query(&sql)
            .bind(owner.id())
            .bind(&values)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_voucher(
    conn: &mut PgConnection,
    row: Option<VoucherRow>,
) -> Result<Option<Voucher>, RepositoryError> {
    let Some(row) = row else {
        return Ok(None);
    };
    let scope = load_scope(conn, ScopeOwner::Voucher(row.id)).await?;
    row.into_voucher(scope).map(Some)
}

async fn load_sale(
    conn: &mut PgConnection,
    row: Option<SaleRow>,
) -> Result<Option<Sale>, RepositoryError> {
    let Some(row) = row else {
        return Ok(None);
    };
    let scope = load_scope(conn, ScopeOwner::Sale(row.id)).await?;
    Ok(Some(row.into_sale(scope)))
}

async fn load_scope(
    conn: &mut PgConnection,
    owner: ScopeOwner,
) -> Result<CatalogueScope, RepositoryError> {
    let tables = owner.tables();
    let owner_column = tables.owner_column;

    let products: Vec<ProductId> = sqlx::query_scalar(&format!(
        "SELECT product_id FROM {} WHERE {owner_column} = $1",
        tables.products
    ))
    .bind(owner.id())
    .fetch_all(&mut *conn)
    .await?;

    let collections: Vec<CollectionId> = sqlx::query_scalar(&format!(
        "SELECT collection_id FROM {} WHERE {owner_column} = $1",
        tables.collections
    ))
    .bind(owner.id())
    .fetch_all(&mut *conn)
    .await?;

    let categories: Vec<CategoryId> = sqlx::query_scalar(&format!(
        "SELECT category_id FROM {} WHERE {owner_column} = $1",
        tables.categories
    ))
    .bind(owner.id())
    .fetch_all(&mut *conn)
    .await?;

    Ok(CatalogueScope::from_parts(products, collections, categories))
}

fn ids<T>(values: &[T], as_i32: impl Fn(&T) -> i32) -> Vec<i32> {
    values.iter().map(as_i32).collect()
}

fn to_db_count(count: u32) -> Result<i32, RepositoryError> {
    i32::try_from(count).map_err(|e| RepositoryError::Database(sqlx::Error::Encode(Box::new(e))))
}

fn code_conflict(e: sqlx::Error, code: &VoucherCode) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("voucher code {code} already exists"));
    }
    RepositoryError::Database(e)
}
