//! Voucher and sale management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a 10% voucher with a generated code
//! sk-cli voucher create --percentage --value 10 --name "Spring"
//!
//! # Create a product voucher limited to two products
//! sk-cli voucher create --type product --value 5 --product 12 --product 13
//!
//! # Switch it to a percentage
//! sk-cli voucher update 1 --percentage --value 10
//!
//! # Create a sale ending on a date
//! sk-cli sale create --name "Clearance" --value 5 --end-date 2026-12-31
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin
//! - `ADMIN_VOUCHER_CODE_LENGTH` - Length of generated voucher codes

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use storekeep_admin::config::{AdminConfig, ConfigError};
use storekeep_admin::db;
use storekeep_admin::services::{DiscountService, DiscountServiceError};
use storekeep_core::{
    CatalogueInput, CategoryId, CollectionId, DiscountValueType, ProductId, SaleId, SaleInput,
    SaleUpdate, ScopeOp, VoucherId, VoucherInput, VoucherType, VoucherUpdate,
};

/// Errors that can occur during discount commands.
#[derive(Debug, Error)]
pub enum DiscountCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Discount(#[from] DiscountServiceError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Catalogue entities named on the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct CatalogueArgs {
    /// Product ID (repeatable)
    #[arg(long = "product")]
    pub products: Vec<i32>,
    /// Collection ID (repeatable)
    #[arg(long = "collection")]
    pub collections: Vec<i32>,
    /// Category ID (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<i32>,
}

impl From<CatalogueArgs> for CatalogueInput {
    fn from(args: CatalogueArgs) -> Self {
        Self {
            products: args.products.into_iter().map(ProductId::new).collect(),
            collections: args.collections.into_iter().map(CollectionId::new).collect(),
            categories: args.categories.into_iter().map(CategoryId::new).collect(),
        }
    }
}

/// Voucher fields accepted by `voucher create`.
#[derive(Debug, Clone, Args)]
pub struct VoucherArgs {
    /// Voucher code (generated when omitted)
    #[arg(long)]
    pub code: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    /// What the voucher discounts
    #[arg(long = "type", value_enum, default_value = "value")]
    pub voucher_type: VoucherKind,
    /// Discount amount, or percent with `--percentage`
    #[arg(long)]
    pub value: Decimal,
    #[arg(long)]
    pub percentage: bool,
    #[arg(long)]
    pub usage_limit: Option<u32>,
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    #[arg(long)]
    pub min_amount_spent: Option<Decimal>,
    /// Country code the voucher is limited to (repeatable)
    #[arg(long = "country")]
    pub countries: Vec<String>,
    /// Initial scope
    #[command(flatten)]
    pub catalogue: CatalogueArgs,
}

impl From<VoucherArgs> for VoucherInput {
    fn from(args: VoucherArgs) -> Self {
        Self {
            voucher_type: args.voucher_type.into(),
            name: args.name,
            code: args.code,
            usage_limit: args.usage_limit,
            start_date: args.start_date,
            end_date: args.end_date,
            discount_value_type: value_type(args.percentage),
            discount_value: args.value,
            min_amount_spent: args.min_amount_spent,
            countries: args.countries,
            catalogues: args.catalogue.into(),
        }
    }
}

/// Voucher fields accepted by `voucher update`; omitted flags are left alone.
#[derive(Debug, Clone, Default, Args)]
pub struct VoucherUpdateArgs {
    #[arg(long)]
    pub code: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long = "type", value_enum)]
    pub voucher_type: Option<VoucherKind>,
    #[arg(long)]
    pub value: Option<Decimal>,
    /// Interpret the value as a percentage
    #[arg(long)]
    pub percentage: bool,
    /// Interpret the value as a fixed amount
    #[arg(long, conflicts_with = "percentage")]
    pub fixed: bool,
    #[arg(long)]
    pub usage_limit: Option<u32>,
    #[arg(long, conflicts_with = "usage_limit")]
    pub unlimited: bool,
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    #[arg(long, conflicts_with = "end_date")]
    pub no_end_date: bool,
    #[arg(long)]
    pub min_amount_spent: Option<Decimal>,
    #[arg(long, conflicts_with = "min_amount_spent")]
    pub no_min_amount: bool,
    /// Replace the country list (repeatable)
    #[arg(long = "country")]
    pub countries: Vec<String>,
    /// Clear the country list
    #[arg(long, conflicts_with = "countries")]
    pub all_countries: bool,
}

impl From<VoucherUpdateArgs> for VoucherUpdate {
    fn from(args: VoucherUpdateArgs) -> Self {
        let countries = if args.all_countries || !args.countries.is_empty() {
            Some(args.countries)
        } else {
            None
        };
        Self {
            voucher_type: args.voucher_type.map(Into::into),
            name: args.name,
            code: args.code,
            usage_limit: nullable(args.usage_limit, args.unlimited),
            start_date: args.start_date,
            end_date: nullable(args.end_date, args.no_end_date),
            discount_value_type: value_type_change(args.percentage, args.fixed),
            discount_value: args.value,
            min_amount_spent: nullable(args.min_amount_spent, args.no_min_amount),
            countries,
        }
    }
}

/// Sale fields accepted by `sale create`.
#[derive(Debug, Clone, Args)]
pub struct SaleArgs {
    #[arg(long)]
    pub name: String,
    /// Discount amount, or percent with `--percentage`
    #[arg(long)]
    pub value: Decimal,
    #[arg(long)]
    pub percentage: bool,
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
}

impl From<SaleArgs> for SaleInput {
    fn from(args: SaleArgs) -> Self {
        Self {
            name: args.name,
            value_type: value_type(args.percentage),
            value: args.value,
            start_date: args.start_date,
            end_date: args.end_date,
        }
    }
}

/// Sale fields accepted by `sale update`.
#[derive(Debug, Clone, Default, Args)]
pub struct SaleUpdateArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub value: Option<Decimal>,
    /// Interpret the value as a percentage
    #[arg(long)]
    pub percentage: bool,
    /// Interpret the value as a fixed amount
    #[arg(long, conflicts_with = "percentage")]
    pub fixed: bool,
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    #[arg(long, conflicts_with = "end_date")]
    pub no_end_date: bool,
}

impl From<SaleUpdateArgs> for SaleUpdate {
    fn from(args: SaleUpdateArgs) -> Self {
        Self {
            name: args.name,
            value_type: value_type_change(args.percentage, args.fixed),
            value: args.value,
            start_date: args.start_date,
            end_date: nullable(args.end_date, args.no_end_date),
        }
    }
}

/// Command-line spelling of [`VoucherType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum VoucherKind {
    Value,
    Product,
    Collection,
    Category,
    Shipping,
}

impl From<VoucherKind> for VoucherType {
    fn from(kind: VoucherKind) -> Self {
        match kind {
            VoucherKind::Value => Self::Value,
            VoucherKind::Product => Self::Product,
            VoucherKind::Collection => Self::Collection,
            VoucherKind::Category => Self::Category,
            VoucherKind::Shipping => Self::Shipping,
        }
    }
}

// =============================================================================
// Vouchers
// =============================================================================

/// Create a voucher and print it.
///
/// # Errors
///
/// Returns `DiscountCommandError` if validation or storage fails.
pub async fn create_voucher(args: VoucherArgs) -> Result<VoucherId, DiscountCommandError> {
    let (pool, config) = connect().await?;
    let service = DiscountService::new(&pool, config.voucher_code_length);

    let voucher = service.create_voucher(args.into()).await?;
    print_json(&voucher)?;
    Ok(voucher.id)
}

/// Print a voucher with its scope.
///
/// # Errors
///
/// Returns `DiscountCommandError` if the voucher doesn't exist.
pub async fn show_voucher(id: VoucherId) -> Result<(), DiscountCommandError> {
    let (pool, config) = connect().await?;
    let voucher = DiscountService::new(&pool, config.voucher_code_length)
        .get_voucher(id)
        .await?;
    print_json(&voucher)
}

/// Update a voucher and print the result.
///
/// # Errors
///
/// Returns `DiscountCommandError` if the voucher doesn't exist or the update is invalid.
pub async fn update_voucher(
    id: VoucherId,
    args: VoucherUpdateArgs,
) -> Result<(), DiscountCommandError> {
    let (pool, config) = connect().await?;
    let voucher = DiscountService::new(&pool, config.voucher_code_length)
        .update_voucher(id, args.into())
        .await?;
    print_json(&voucher)
}

/// Delete a voucher.
///
/// # Errors
///
/// Returns `DiscountCommandError` if the voucher doesn't exist.
pub async fn delete_voucher(id: VoucherId) -> Result<(), DiscountCommandError> {
    let (pool, config) = connect().await?;
    DiscountService::new(&pool, config.voucher_code_length)
        .delete_voucher(id)
        .await?;
    Ok(())
}

/// Add catalogue entities to, or remove them from, a voucher's scope.
///
/// # Errors
///
/// Returns `DiscountCommandError` if the voucher doesn't exist.
pub async fn voucher_scope(
    id: VoucherId,
    op: ScopeOp,
    args: CatalogueArgs,
) -> Result<(), DiscountCommandError> {
    let (pool, config) = connect().await?;
    let service = DiscountService::new(&pool, config.voucher_code_length);
    let input = CatalogueInput::from(args);

    let voucher = match op {
        ScopeOp::Add => service.voucher_catalogues_add(id, &input).await?,
        ScopeOp::Remove => service.voucher_catalogues_remove(id, &input).await?,
    };
    print_json(&voucher)
}

// =============================================================================
// Sales
// =============================================================================

/// Create a sale and print it.
///
/// # Errors
///
/// Returns `DiscountCommandError` if validation or storage fails.
pub async fn create_sale(args: SaleArgs) -> Result<SaleId, DiscountCommandError> {
    let (pool, config) = connect().await?;
    let sale = DiscountService::new(&pool, config.voucher_code_length)
        .create_sale(args.into())
        .await?;
    print_json(&sale)?;
    Ok(sale.id)
}

/// Print a sale with its scope.
///
/// # Errors
///
/// Returns `DiscountCommandError` if the sale doesn't exist.
pub async fn show_sale(id: SaleId) -> Result<(), DiscountCommandError> {
    let (pool, config) = connect().await?;
    let sale = DiscountService::new(&pool, config.voucher_code_length)
        .get_sale(id)
        .await?;
    print_json(&sale)
}

/// Update a sale and print the result.
///
/// # Errors
///
/// Returns `DiscountCommandError` if the sale doesn't exist or the update is invalid.
pub async fn update_sale(id: SaleId, args: SaleUpdateArgs) -> Result<(), DiscountCommandError> {
    let (pool, config) = connect().await?;
    let sale = DiscountService::new(&pool, config.voucher_code_length)
        .update_sale(id, args.into())
        .await?;
    print_json(&sale)
}

/// Delete a sale.
///
/// # Errors
///
/// Returns `DiscountCommandError` if the sale doesn't exist.
pub async fn delete_sale(id: SaleId) -> Result<(), DiscountCommandError> {
    let (pool, config) = connect().await?;
    DiscountService::new(&pool, config.voucher_code_length)
        .delete_sale(id)
        .await?;
    Ok(())
}

/// Add catalogue entities to, or remove them from, a sale's scope.
///
/// # Errors
///
/// Returns `DiscountCommandError` if the sale doesn't exist.
pub async fn sale_scope(
    id: SaleId,
    op: ScopeOp,
    args: CatalogueArgs,
) -> Result<(), DiscountCommandError> {
    let (pool, config) = connect().await?;
    let service = DiscountService::new(&pool, config.voucher_code_length);
    let input = CatalogueInput::from(args);

    let sale = match op {
        ScopeOp::Add => service.sale_catalogues_add(id, &input).await?,
        ScopeOp::Remove => service.sale_catalogues_remove(id, &input).await?,
    };
    print_json(&sale)
}

// =============================================================================
// Helpers
// =============================================================================

async fn connect() -> Result<(PgPool, AdminConfig), DiscountCommandError> {
    let config = AdminConfig::from_env()?;
    tracing::debug!("Connecting to admin database...");
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    Ok((pool, config))
}

const fn value_type(percentage: bool) -> DiscountValueType {
    if percentage {
        DiscountValueType::Percentage
    } else {
        DiscountValueType::Fixed
    }
}

/// `--percentage` or `--fixed` switches the value type; neither keeps it.
const fn value_type_change(percentage: bool, fixed: bool) -> Option<DiscountValueType> {
    if percentage {
        Some(DiscountValueType::Percentage)
    } else if fixed {
        Some(DiscountValueType::Fixed)
    } else {
        None
    }
}

/// `--flag` sets a value, `--no-flag` clears it, neither leaves it alone.
#[allow(clippy::option_option)]
fn nullable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

#[allow(clippy::print_stdout)]
fn print_json(value: &impl Serialize) -> Result<(), DiscountCommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
