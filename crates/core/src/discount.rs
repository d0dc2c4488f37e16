//! Vouchers, sales, and their catalogue scope.
//!
//! Both discount variants share one scope model: three sets of catalogue
//! identifiers (products, collections, categories). Which orders a scope
//! actually matches is decided by the pricing layer, not here.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CategoryId, CollectionId, ProductId, SaleId, VoucherId};

/// Errors raised when validating discount input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscountError {
    /// A field failed validation.
    #[error("{field}: {message}")]
    Validation {
        /// Input field that failed.
        field: &'static str,
        /// Human-readable reason.
        message: String,
    },
}

impl DiscountError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// The input field the error refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Validation { field, .. } => field,
        }
    }
}

// =============================================================================
// Enums
// =============================================================================

/// What a voucher discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin.voucher_type", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherType {
    /// Amount off the whole order.
    #[default]
    Value,
    /// Amount off products in scope.
    Product,
    /// Amount off products in collections in scope.
    Collection,
    /// Amount off products in categories in scope.
    Category,
    /// Amount off shipping.
    Shipping,
}

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin.discount_value_type", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountValueType {
    /// A fixed amount in the store currency.
    #[default]
    Fixed,
    /// A percentage of the discounted price.
    Percentage,
}

impl std::fmt::Display for DiscountValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Percentage => write!(f, "percentage"),
        }
    }
}

// =============================================================================
// Catalogue Scope
// =============================================================================

/// Catalogue entities to add to or remove from a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueInput {
    /// Products.
    pub products: Vec<ProductId>,
    /// Collections.
    pub collections: Vec<CollectionId>,
    /// Categories.
    pub categories: Vec<CategoryId>,
}

impl CatalogueInput {
    /// Whether the input names no entities at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.collections.is_empty() && self.categories.is_empty()
    }
}

/// Direction of a scope change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeOp {
    /// Set union.
    Add,
    /// Set difference.
    Remove,
}

/// The catalogue entities a discount applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueScope {
    products: HashSet<ProductId>,
    collections: HashSet<CollectionId>,
    categories: HashSet<CategoryId>,
}

/// The entities an add or remove actually changed.
///
/// Each list is sorted, so deltas compare equal regardless of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDelta {
    /// Products inserted or removed.
    pub products: Vec<ProductId>,
    /// Collections inserted or removed.
    pub collections: Vec<CollectionId>,
    /// Categories inserted or removed.
    pub categories: Vec<CategoryId>,
}

impl ScopeDelta {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.collections.is_empty() && self.categories.is_empty()
    }

    /// Total number of changed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len() + self.collections.len() + self.categories.len()
    }
}

impl CatalogueScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from stored identifiers. Duplicates collapse.
    #[must_use]
    pub fn from_parts(
        products: impl IntoIterator<Item = ProductId>,
        collections: impl IntoIterator<Item = CollectionId>,
        categories: impl IntoIterator<Item = CategoryId>,
    ) -> Self {
        Self {
            products: products.into_iter().collect(),
            collections: collections.into_iter().collect(),
            categories: categories.into_iter().collect(),
        }
    }

    /// Products in scope.
    #[must_use]
    pub const fn products(&self) -> &HashSet<ProductId> {
        &self.products
    }

    /// Collections in scope.
    #[must_use]
    pub const fn collections(&self) -> &HashSet<CollectionId> {
        &self.collections
    }

    /// Categories in scope.
    #[must_use]
    pub const fn categories(&self) -> &HashSet<CategoryId> {
        &self.categories
    }

    /// Whether the scope names no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.collections.is_empty() && self.categories.is_empty()
    }

    /// Add every entity in `input`; already present ones are ignored.
    pub fn add(&mut self, input: &CatalogueInput) -> ScopeDelta {
        ScopeDelta {
            products: insert_all(&mut self.products, &input.products),
            collections: insert_all(&mut self.collections, &input.collections),
            categories: insert_all(&mut self.categories, &input.categories),
        }
    }

    /// Remove every entity in `input`; absent ones are ignored.
    pub fn remove(&mut self, input: &CatalogueInput) -> ScopeDelta {
        ScopeDelta {
            products: remove_all(&mut self.products, &input.products),
            collections: remove_all(&mut self.collections, &input.collections),
            categories: remove_all(&mut self.categories, &input.categories),
        }
    }

    /// Add or remove `input` depending on `op`.
    pub fn apply(&mut self, op: ScopeOp, input: &CatalogueInput) -> ScopeDelta {
        match op {
            ScopeOp::Add => self.add(input),
            ScopeOp::Remove => self.remove(input),
        }
    }
}

fn insert_all<T: Copy + Eq + Hash + Ord>(set: &mut HashSet<T>, items: &[T]) -> Vec<T> {
    let mut changed: Vec<T> = items.iter().copied().filter(|item| set.insert(*item)).collect();
    changed.sort_unstable();
    changed
}

fn remove_all<T: Copy + Eq + Hash + Ord>(set: &mut HashSet<T>, items: &[T]) -> Vec<T> {
    let mut changed: Vec<T> = items.iter().copied().filter(|item| set.remove(item)).collect();
    changed.sort_unstable();
    changed
}

/// A discount whose reach is limited to a catalogue scope.
pub trait CatalogueScoped {
    /// The current scope.
    fn scope(&self) -> &CatalogueScope;

    /// Mutable access to the scope.
    fn scope_mut(&mut self) -> &mut CatalogueScope;

    /// Add catalogue entities to the scope (set union).
    fn add_catalogues(&mut self, input: &CatalogueInput) -> ScopeDelta {
        self.scope_mut().add(input)
    }

    /// Remove catalogue entities from the scope (set difference).
    fn remove_catalogues(&mut self, input: &CatalogueInput) -> ScopeDelta {
        self.scope_mut().remove(input)
    }

    /// Add or remove catalogue entities depending on `op`.
    fn change_catalogues(&mut self, op: ScopeOp, input: &CatalogueInput) -> ScopeDelta {
        self.scope_mut().apply(op, input)
    }
}

// =============================================================================
// Voucher Code
// =============================================================================

/// A normalized voucher code: upper-case ASCII letters, digits, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Maximum code length.
    pub const MAX_LENGTH: usize = 32;

    /// Length of generated codes unless configured otherwise.
    pub const DEFAULT_GENERATED_LENGTH: usize = 12;

    /// Characters used for generated codes (no `0`/`O`, `1`/`I`).
    const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Parse a user-supplied code, trimming and upper-casing it.
    ///
    /// # Errors
    ///
    /// Returns a validation error on the `code` field if the code is empty,
    /// too long, or contains characters other than letters, digits, `-`, `_`.
    pub fn parse(s: &str) -> Result<Self, DiscountError> {
        let code = s.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(DiscountError::invalid("code", "code cannot be empty"));
        }
        if code.len() > Self::MAX_LENGTH {
            return Err(DiscountError::invalid(
                "code",
                format!("code must be at most {} characters", Self::MAX_LENGTH),
            ));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DiscountError::invalid(
                "code",
                "code may only contain letters, digits, '-' and '_'",
            ));
        }
        Ok(Self(code))
    }

    /// Generate a random code of `length` characters (clamped to 1..=`MAX_LENGTH`).
    #[must_use]
    pub fn generate(length: usize) -> Self {
        let length = length.clamp(1, Self::MAX_LENGTH);
        let mut rng = rand::rng();
        let code = (0..length)
            .filter_map(|_| Self::ALPHABET.choose(&mut rng).copied())
            .map(char::from)
            .collect();
        Self(code)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a code read back from storage.
    #[must_use]
    pub const fn from_stored(code: String) -> Self {
        Self(code)
    }
}

impl std::fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Voucher
// =============================================================================

/// A code-redeemed discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Storage-assigned identifier.
    pub id: VoucherId,
    /// What the voucher discounts.
    pub voucher_type: VoucherType,
    /// Optional label for staff.
    pub name: Option<String>,
    /// Code customers redeem, unique across vouchers.
    pub code: VoucherCode,
    /// Maximum number of redemptions; `None` is unlimited.
    pub usage_limit: Option<u32>,
    /// Redemptions so far.
    pub used: u32,
    /// First day the voucher is valid.
    pub start_date: NaiveDate,
    /// Last day the voucher is valid, inclusive.
    pub end_date: Option<NaiveDate>,
    /// How `discount_value` is interpreted.
    pub discount_value_type: DiscountValueType,
    /// Amount or percentage off.
    pub discount_value: Decimal,
    /// Minimum order subtotal required to redeem.
    pub min_amount_spent: Option<Decimal>,
    /// ISO 3166-1 alpha-2 codes; empty means every country.
    pub countries: Vec<String>,
    /// Catalogue entities the voucher applies to.
    pub scope: CatalogueScope,
}

impl Voucher {
    /// Whether the voucher can be redeemed on `today`.
    #[must_use]
    pub fn is_active(&self, today: NaiveDate) -> bool {
        within_window(self.start_date, self.end_date, today)
            && self.usage_limit.is_none_or(|limit| self.used < limit)
    }

    /// Apply a partial update, validating the result as a whole.
    ///
    /// On error the voucher is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field.
    pub fn apply_update(&mut self, update: VoucherUpdate) -> Result<(), DiscountError> {
        let mut next = self.clone();
        if let Some(voucher_type) = update.voucher_type {
            next.voucher_type = voucher_type;
        }
        if let Some(name) = update.name {
            next.name = non_empty(name);
        }
        if let Some(code) = update.code {
            next.code = VoucherCode::parse(&code)?;
        }
        if let Some(usage_limit) = update.usage_limit {
            next.usage_limit = usage_limit;
        }
        if let Some(start_date) = update.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            next.end_date = end_date;
        }
        if let Some(value_type) = update.discount_value_type {
            next.discount_value_type = value_type;
        }
        if let Some(value) = update.discount_value {
            next.discount_value = value;
        }
        if let Some(min_amount_spent) = update.min_amount_spent {
            next.min_amount_spent = min_amount_spent;
        }
        if let Some(countries) = update.countries {
            next.countries = normalize_countries(&countries)?;
        }

        validate_value(next.discount_value_type, next.discount_value, "discount_value")?;
        validate_window(next.start_date, next.end_date)?;
        validate_min_amount(next.min_amount_spent)?;
        validate_voucher_scope(next.voucher_type, &next.scope)?;

        *self = next;
        Ok(())
    }
}

impl CatalogueScoped for Voucher {
    fn scope(&self) -> &CatalogueScope {
        &self.scope
    }

    fn scope_mut(&mut self) -> &mut CatalogueScope {
        &mut self.scope
    }
}

/// Input for creating a voucher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoucherInput {
    /// What the voucher discounts.
    pub voucher_type: VoucherType,
    /// Optional label; blank means none.
    pub name: Option<String>,
    /// Empty or missing means "generate one".
    pub code: Option<String>,
    /// Maximum number of redemptions.
    pub usage_limit: Option<u32>,
    /// Defaults to the creation day.
    pub start_date: Option<NaiveDate>,
    /// Last valid day, inclusive.
    pub end_date: Option<NaiveDate>,
    /// How `discount_value` is interpreted.
    pub discount_value_type: DiscountValueType,
    /// Amount or percentage off.
    pub discount_value: Decimal,
    /// Minimum order subtotal required to redeem.
    pub min_amount_spent: Option<Decimal>,
    /// Country codes, any case.
    pub countries: Vec<String>,
    /// Initial scope.
    pub catalogues: CatalogueInput,
}

/// A validated voucher that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoucher {
    /// What the voucher discounts.
    pub voucher_type: VoucherType,
    /// Trimmed label, if any.
    pub name: Option<String>,
    /// Normalized or generated code.
    pub code: VoucherCode,
    /// Maximum number of redemptions.
    pub usage_limit: Option<u32>,
    /// First valid day.
    pub start_date: NaiveDate,
    /// Last valid day, inclusive.
    pub end_date: Option<NaiveDate>,
    /// How `discount_value` is interpreted.
    pub discount_value_type: DiscountValueType,
    /// Amount or percentage off.
    pub discount_value: Decimal,
    /// Minimum order subtotal required to redeem.
    pub min_amount_spent: Option<Decimal>,
    /// Upper-cased, sorted, deduplicated country codes.
    pub countries: Vec<String>,
    /// Initial scope as sorted, distinct identifiers.
    pub scope: ScopeDelta,
}

impl VoucherInput {
    /// Validate the input.
    ///
    /// A missing start date defaults to `today`. A missing or blank code is
    /// replaced with a generated one of `generated_code_length` characters.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field.
    pub fn validate(
        self,
        today: NaiveDate,
        generated_code_length: usize,
    ) -> Result<NewVoucher, DiscountError> {
        let code = match self.code.as_deref().map(str::trim) {
            None | Some("") => VoucherCode::generate(generated_code_length),
            Some(code) => VoucherCode::parse(code)?,
        };
        let start_date = self.start_date.unwrap_or(today);

        validate_value(self.discount_value_type, self.discount_value, "discount_value")?;
        validate_window(start_date, self.end_date)?;
        validate_min_amount(self.min_amount_spent)?;
        let countries = normalize_countries(&self.countries)?;

        let mut scope = CatalogueScope::new();
        let initial_scope = scope.add(&self.catalogues);
        validate_voucher_scope(self.voucher_type, &scope)?;

        Ok(NewVoucher {
            voucher_type: self.voucher_type,
            name: self.name.and_then(non_empty),
            code,
            usage_limit: self.usage_limit,
            start_date,
            end_date: self.end_date,
            discount_value_type: self.discount_value_type,
            discount_value: self.discount_value,
            min_amount_spent: self.min_amount_spent,
            countries,
            scope: initial_scope,
        })
    }
}

impl NewVoucher {
    /// Attach the storage-assigned id, with no uses.
    #[must_use]
    pub fn into_voucher(self, id: VoucherId) -> Voucher {
        Voucher {
            id,
            voucher_type: self.voucher_type,
            name: self.name,
            code: self.code,
            usage_limit: self.usage_limit,
            used: 0,
            start_date: self.start_date,
            end_date: self.end_date,
            discount_value_type: self.discount_value_type,
            discount_value: self.discount_value,
            min_amount_spent: self.min_amount_spent,
            countries: self.countries,
            scope: CatalogueScope::from_parts(
                self.scope.products,
                self.scope.collections,
                self.scope.categories,
            ),
        }
    }
}

/// Partial voucher update. `None` leaves a field alone; for nullable fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoucherUpdate {
    /// New voucher type; must fit the current scope.
    pub voucher_type: Option<VoucherType>,
    /// New label; blank clears it.
    pub name: Option<String>,
    /// New code; blank is rejected.
    pub code: Option<String>,
    /// New redemption limit.
    pub usage_limit: Option<Option<u32>>,
    /// New first valid day.
    pub start_date: Option<NaiveDate>,
    /// New last valid day.
    pub end_date: Option<Option<NaiveDate>>,
    /// New value interpretation.
    pub discount_value_type: Option<DiscountValueType>,
    /// New amount or percentage.
    pub discount_value: Option<Decimal>,
    /// New minimum order subtotal.
    pub min_amount_spent: Option<Option<Decimal>>,
    /// Replacement country list.
    pub countries: Option<Vec<String>>,
}

// =============================================================================
// Sale
// =============================================================================

/// An automatically applied discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Storage-assigned identifier.
    pub id: SaleId,
    /// Display name, never blank.
    pub name: String,
    /// How `value` is interpreted.
    pub value_type: DiscountValueType,
    /// Amount or percentage off.
    pub value: Decimal,
    /// First day the sale applies.
    pub start_date: NaiveDate,
    /// Last day the sale applies, inclusive.
    pub end_date: Option<NaiveDate>,
    /// Catalogue entities the sale applies to.
    pub scope: CatalogueScope,
}

impl Sale {
    /// Whether the sale applies on `today`.
    #[must_use]
    pub fn is_active(&self, today: NaiveDate) -> bool {
        within_window(self.start_date, self.end_date, today)
    }

    /// Apply a partial update, validating the result as a whole.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field.
    pub fn apply_update(&mut self, update: SaleUpdate) -> Result<(), DiscountError> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = required_name(name)?;
        }
        if let Some(value_type) = update.value_type {
            next.value_type = value_type;
        }
        if let Some(value) = update.value {
            next.value = value;
        }
        if let Some(start_date) = update.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            next.end_date = end_date;
        }

        validate_value(next.value_type, next.value, "value")?;
        validate_window(next.start_date, next.end_date)?;

        *self = next;
        Ok(())
    }
}

impl CatalogueScoped for Sale {
    fn scope(&self) -> &CatalogueScope {
        &self.scope
    }

    fn scope_mut(&mut self) -> &mut CatalogueScope {
        &mut self.scope
    }
}

/// Input for creating a sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleInput {
    /// Display name.
    pub name: String,
    /// How `value` is interpreted.
    pub value_type: DiscountValueType,
    /// Amount or percentage off.
    pub value: Decimal,
    /// Defaults to the creation day.
    pub start_date: Option<NaiveDate>,
    /// Last day the sale applies, inclusive.
    pub end_date: Option<NaiveDate>,
}

/// A validated sale that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    /// Trimmed display name.
    pub name: String,
    /// How `value` is interpreted.
    pub value_type: DiscountValueType,
    /// Amount or percentage off.
    pub value: Decimal,
    /// First day the sale applies.
    pub start_date: NaiveDate,
    /// Last day the sale applies, inclusive.
    pub end_date: Option<NaiveDate>,
}

impl SaleInput {
    /// Validate the input. A missing start date defaults to `today`.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field.
    pub fn validate(self, today: NaiveDate) -> Result<NewSale, DiscountError> {
        let name = required_name(self.name)?;
        let start_date = self.start_date.unwrap_or(today);
        validate_value(self.value_type, self.value, "value")?;
        validate_window(start_date, self.end_date)?;

        Ok(NewSale {
            name,
            value_type: self.value_type,
            value: self.value,
            start_date,
            end_date: self.end_date,
        })
    }
}

impl NewSale {
    /// Attach the storage-assigned id, with an empty scope.
    #[must_use]
    pub fn into_sale(self, id: SaleId) -> Sale {
        Sale {
            id,
            name: self.name,
            value_type: self.value_type,
            value: self.value,
            start_date: self.start_date,
            end_date: self.end_date,
            scope: CatalogueScope::new(),
        }
    }
}

/// Partial sale update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleUpdate {
    /// New name; blank is rejected.
    pub name: Option<String>,
    /// New value interpretation.
    pub value_type: Option<DiscountValueType>,
    /// New amount or percentage.
    pub value: Option<Decimal>,
    /// New first day.
    pub start_date: Option<NaiveDate>,
    /// New last day.
    pub end_date: Option<Option<NaiveDate>>,
}

// =============================================================================
// Validation Helpers
// =============================================================================

fn within_window(start: NaiveDate, end: Option<NaiveDate>, today: NaiveDate) -> bool {
    start <= today && end.is_none_or(|end| today <= end)
}

fn validate_value(
    value_type: DiscountValueType,
    value: Decimal,
    field: &'static str,
) -> Result<(), DiscountError> {
    if value < Decimal::ZERO {
        return Err(DiscountError::invalid(field, "value cannot be negative"));
    }
    if value_type == DiscountValueType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(DiscountError::invalid(field, "percentage cannot exceed 100"));
    }
    Ok(())
}

fn validate_window(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), DiscountError> {
    match end {
        Some(end) if end < start => Err(DiscountError::invalid(
            "end_date",
            "end date cannot precede start date",
        )),
        _ => Ok(()),
    }
}

fn validate_min_amount(amount: Option<Decimal>) -> Result<(), DiscountError> {
    match amount {
        Some(amount) if amount < Decimal::ZERO => Err(DiscountError::invalid(
            "min_amount_spent",
            "minimum amount cannot be negative",
        )),
        _ => Ok(()),
    }
}

/// Product, collection and category vouchers need at least one entity of
/// their kind in scope.
fn validate_voucher_scope(
    voucher_type: VoucherType,
    scope: &CatalogueScope,
) -> Result<(), DiscountError> {
    let missing = match voucher_type {
        VoucherType::Product if scope.products.is_empty() => Some("products"),
        VoucherType::Collection if scope.collections.is_empty() => Some("collections"),
        VoucherType::Category if scope.categories.is_empty() => Some("categories"),
        _ => None,
    };
    missing.map_or(Ok(()), |field| {
        Err(DiscountError::invalid(
            field,
            format!("{field} are required for this voucher type"),
        ))
    })
}

fn normalize_countries(countries: &[String]) -> Result<Vec<String>, DiscountError> {
    let mut normalized = Vec::with_capacity(countries.len());
    for country in countries {
        let code = country.trim().to_ascii_uppercase();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DiscountError::invalid(
                "countries",
                format!("invalid country code: {country}"),
            ));
        }
        normalized.push(code);
    }
    normalized.sort_unstable();
    normalized.dedup();
    Ok(normalized)
}

fn required_name(name: String) -> Result<String, DiscountError> {
    non_empty(name).ok_or_else(|| DiscountError::invalid("name", "name cannot be empty"))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(num: i64, scale: u32) -> Decimal {
        Decimal::new(num, scale)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn voucher() -> Voucher {
        VoucherInput {
            name: Some("Voucher".to_owned()),
            code: Some("summer".to_owned()),
            discount_value: dec(123, 0),
            start_date: Some(date(2018, 1, 1)),
            ..VoucherInput::default()
        }
        .validate(date(2018, 1, 1), VoucherCode::DEFAULT_GENERATED_LENGTH)
        .unwrap()
        .into_voucher(VoucherId::new(1))
    }

    fn sale() -> Sale {
        SaleInput {
            name: "Sale".to_owned(),
            value: dec(123, 0),
            start_date: Some(date(2018, 1, 1)),
            ..SaleInput::default()
        }
        .validate(date(2018, 1, 1))
        .unwrap()
        .into_sale(SaleId::new(1))
    }

    fn everything() -> CatalogueInput {
        CatalogueInput {
            products: vec![ProductId::new(1)],
            collections: vec![CollectionId::new(2)],
            categories: vec![CategoryId::new(3)],
        }
    }

    // =========================================================================
    // Scope
    // =========================================================================

    #[test]
    fn test_add_same_product_twice_keeps_one() {
        let mut voucher = voucher();
        let input = CatalogueInput {
            products: vec![ProductId::new(7)],
            ..CatalogueInput::default()
        };

        let first = voucher.add_catalogues(&input);
        let second = voucher.add_catalogues(&input);

        assert_eq!(first.products, vec![ProductId::new(7)]);
        assert!(second.is_empty());
        assert_eq!(voucher.scope().products().len(), 1);
    }

    #[test]
    fn test_add_with_duplicates_in_input() {
        let mut sale = sale();
        let input = CatalogueInput {
            products: vec![ProductId::new(3), ProductId::new(1), ProductId::new(3)],
            ..CatalogueInput::default()
        };

        let delta = sale.add_catalogues(&input);

        assert_eq!(delta.products, vec![ProductId::new(1), ProductId::new(3)]);
        assert_eq!(sale.scope().products().len(), 2);
    }

    #[test]
    fn test_add_all_kinds() {
        let mut sale = sale();
        let delta = sale.add_catalogues(&everything());

        assert_eq!(delta.len(), 3);
        assert!(sale.scope().products().contains(&ProductId::new(1)));
        assert!(sale.scope().collections().contains(&CollectionId::new(2)));
        assert!(sale.scope().categories().contains(&CategoryId::new(3)));
    }

    #[test]
    fn test_add_empty_input_changes_nothing() {
        let mut voucher = voucher();
        voucher.add_catalogues(&everything());
        let before = voucher.scope().clone();

        let delta = voucher.add_catalogues(&CatalogueInput::default());

        assert!(delta.is_empty());
        assert_eq!(voucher.scope(), &before);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut voucher = voucher();
        voucher.add_catalogues(&CatalogueInput {
            products: vec![ProductId::new(1)],
            ..CatalogueInput::default()
        });
        let before = voucher.scope().clone();

        let delta = voucher.remove_catalogues(&CatalogueInput {
            products: vec![ProductId::new(99)],
            ..CatalogueInput::default()
        });

        assert!(delta.is_empty());
        assert_eq!(voucher.scope(), &before);
    }

    #[test]
    fn test_remove_partial_overlap() {
        let mut sale = sale();
        sale.add_catalogues(&everything());

        let delta = sale.remove_catalogues(&CatalogueInput {
            products: vec![ProductId::new(1), ProductId::new(5)],
            categories: vec![CategoryId::new(3)],
            ..CatalogueInput::default()
        });

        assert_eq!(delta.products, vec![ProductId::new(1)]);
        assert_eq!(delta.categories, vec![CategoryId::new(3)]);
        assert!(sale.scope().products().is_empty());
        assert_eq!(sale.scope().collections().len(), 1);
    }

    #[test]
    fn test_remove_empty_input_changes_nothing() {
        let mut sale = sale();
        sale.add_catalogues(&everything());

        assert!(sale.remove_catalogues(&CatalogueInput::default()).is_empty());
        assert!(!sale.scope().is_empty());
    }

    #[test]
    fn test_change_catalogues_dispatches_on_op() {
        let mut voucher = voucher();
        let added = voucher.change_catalogues(ScopeOp::Add, &everything());
        let removed = voucher.change_catalogues(ScopeOp::Remove, &everything());

        assert_eq!(added, removed);
        assert!(voucher.scope().is_empty());
    }

    #[test]
    fn test_scope_from_parts_collapses_duplicates() {
        let scope = CatalogueScope::from_parts(
            [ProductId::new(1), ProductId::new(1)],
            [],
            [CategoryId::new(4)],
        );
        assert_eq!(scope.products().len(), 1);
        assert_eq!(scope.categories().len(), 1);
    }

    #[test]
    fn test_catalogue_input_deserializes_with_missing_lists() {
        let input: CatalogueInput = serde_json::from_str(r#"{"products": [1, 2]}"#).unwrap();
        assert_eq!(input.products.len(), 2);
        assert!(input.collections.is_empty());
        assert!(!input.is_empty());
    }

    // =========================================================================
    // Voucher
    // =========================================================================

    #[test]
    fn test_voucher_code_is_normalized() {
        assert_eq!(voucher().code.as_str(), "SUMMER");
        assert_eq!(VoucherCode::parse(" test-code_1 ").unwrap().as_str(), "TEST-CODE_1");
    }

    #[test]
    fn test_voucher_code_rejects_bad_characters() {
        assert!(VoucherCode::parse("no spaces").is_err());
        assert!(VoucherCode::parse(&"A".repeat(33)).is_err());
        assert_eq!(VoucherCode::parse("  ").unwrap_err().field(), "code");
    }

    #[test]
    fn test_voucher_with_empty_code_gets_generated_code() {
        let new = VoucherInput {
            code: Some(String::new()),
            discount_value: dec(1012, 2),
            ..VoucherInput::default()
        }
        .validate(date(2018, 1, 1), 12)
        .unwrap();

        assert_eq!(new.code.as_str().len(), 12);
        assert!(VoucherCode::parse(new.code.as_str()).is_ok());
    }

    #[test]
    fn test_generated_codes_use_unambiguous_alphabet() {
        let code = VoucherCode::generate(32);
        assert_eq!(code.as_str().len(), 32);
        assert!(!code.as_str().contains(['0', 'O', '1', 'I']));
        assert_eq!(VoucherCode::generate(0).as_str().len(), 1);
    }

    #[test]
    fn test_voucher_rejects_percentage_over_hundred() {
        let err = VoucherInput {
            discount_value_type: DiscountValueType::Percentage,
            discount_value: dec(101, 0),
            ..VoucherInput::default()
        }
        .validate(date(2018, 1, 1), 12)
        .unwrap_err();

        assert_eq!(err.field(), "discount_value");
    }

    #[test]
    fn test_voucher_rejects_inverted_window() {
        let err = VoucherInput {
            start_date: Some(date(2019, 1, 1)),
            end_date: Some(date(2018, 1, 1)),
            ..VoucherInput::default()
        }
        .validate(date(2018, 1, 1), 12)
        .unwrap_err();

        assert_eq!(err.field(), "end_date");
    }

    #[test]
    fn test_voucher_rejects_negative_min_amount() {
        let err = VoucherInput {
            min_amount_spent: Some(dec(-1, 0)),
            ..VoucherInput::default()
        }
        .validate(date(2018, 1, 1), 12)
        .unwrap_err();

        assert_eq!(err.field(), "min_amount_spent");
    }

    #[test]
    fn test_voucher_normalizes_countries() {
        let new = VoucherInput {
            countries: vec!["pl".to_owned(), "DE".to_owned(), "pl ".to_owned()],
            ..VoucherInput::default()
        }
        .validate(date(2018, 1, 1), 12)
        .unwrap();

        assert_eq!(new.countries, vec!["DE".to_owned(), "PL".to_owned()]);

        let err = VoucherInput {
            countries: vec!["Poland".to_owned()],
            ..VoucherInput::default()
        }
        .validate(date(2018, 1, 1), 12)
        .unwrap_err();
        assert_eq!(err.field(), "countries");
    }

    #[test]
    fn test_voucher_start_date_defaults_to_today() {
        let new = VoucherInput::default().validate(date(2020, 5, 4), 12).unwrap();
        assert_eq!(new.start_date, date(2020, 5, 4));
    }

    #[test]
    fn test_voucher_is_active() {
        let mut voucher = voucher();
        voucher.end_date = Some(date(2019, 1, 1));

        assert!(!voucher.is_active(date(2017, 12, 31)));
        assert!(voucher.is_active(date(2018, 1, 1)));
        assert!(voucher.is_active(date(2019, 1, 1)));
        assert!(!voucher.is_active(date(2019, 1, 2)));

        voucher.usage_limit = Some(1);
        voucher.used = 1;
        assert!(!voucher.is_active(date(2018, 6, 1)));
    }

    #[test]
    fn test_voucher_update_changes_fields() {
        let mut voucher = voucher();
        voucher
            .apply_update(VoucherUpdate {
                code: Some("testcode123".to_owned()),
                discount_value_type: Some(DiscountValueType::Percentage),
                discount_value: Some(dec(10, 0)),
                ..VoucherUpdate::default()
            })
            .unwrap();

        assert_eq!(voucher.code.as_str(), "TESTCODE123");
        assert_eq!(voucher.discount_value_type, DiscountValueType::Percentage);
    }

    #[test]
    fn test_voucher_update_is_atomic() {
        let mut voucher = voucher();
        let before = voucher.clone();

        // 123 as a percentage is out of range.
        let err = voucher
            .apply_update(VoucherUpdate {
                code: Some("other".to_owned()),
                discount_value_type: Some(DiscountValueType::Percentage),
                ..VoucherUpdate::default()
            })
            .unwrap_err();

        assert_eq!(err.field(), "discount_value");
        assert_eq!(voucher, before);
    }

    #[test]
    fn test_voucher_update_clears_end_date() {
        let mut voucher = voucher();
        voucher.end_date = Some(date(2019, 1, 1));
        voucher
            .apply_update(VoucherUpdate {
                end_date: Some(None),
                ..VoucherUpdate::default()
            })
            .unwrap();
        assert_eq!(voucher.end_date, None);
    }

    fn voucher_of_type(voucher_type: VoucherType, catalogues: CatalogueInput) -> VoucherInput {
        VoucherInput {
            voucher_type,
            discount_value: dec(5, 0),
            catalogues,
            ..VoucherInput::default()
        }
    }

    #[test]
    fn test_create_product_voucher_requires_products() {
        let err = voucher_of_type(VoucherType::Product, CatalogueInput::default())
            .validate(date(2018, 1, 1), 12)
            .unwrap_err();
        assert_eq!(err.field(), "products");
    }

    #[test]
    fn test_create_collection_voucher_requires_collections() {
        // Products do not satisfy a collection voucher.
        let input = CatalogueInput {
            products: vec![ProductId::new(1)],
            ..CatalogueInput::default()
        };
        let err = voucher_of_type(VoucherType::Collection, input)
            .validate(date(2018, 1, 1), 12)
            .unwrap_err();
        assert_eq!(err.field(), "collections");
    }

    #[test]
    fn test_create_category_voucher_requires_categories() {
        let err = voucher_of_type(VoucherType::Category, CatalogueInput::default())
            .validate(date(2018, 1, 1), 12)
            .unwrap_err();
        assert_eq!(err.field(), "categories");
    }

    #[test]
    fn test_create_voucher_with_initial_scope() {
        let input = CatalogueInput {
            products: vec![ProductId::new(4), ProductId::new(2), ProductId::new(4)],
            ..CatalogueInput::default()
        };
        let new = voucher_of_type(VoucherType::Product, input)
            .validate(date(2018, 1, 1), 12)
            .unwrap();
        assert_eq!(new.scope.products, vec![ProductId::new(2), ProductId::new(4)]);

        let voucher = new.into_voucher(VoucherId::new(9));
        assert_eq!(voucher.scope().products().len(), 2);
        assert_eq!(voucher.used, 0);
    }

    #[test]
    fn test_value_and_shipping_vouchers_need_no_scope() {
        for voucher_type in [VoucherType::Value, VoucherType::Shipping] {
            assert!(
                voucher_of_type(voucher_type, CatalogueInput::default())
                    .validate(date(2018, 1, 1), 12)
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_update_type_requires_matching_scope() {
        let cases = [
            (VoucherType::Category, "categories"),
            (VoucherType::Product, "products"),
            (VoucherType::Collection, "collections"),
        ];
        for (voucher_type, field) in cases {
            let mut voucher = voucher();
            let before = voucher.clone();

            let err = voucher
                .apply_update(VoucherUpdate {
                    voucher_type: Some(voucher_type),
                    ..VoucherUpdate::default()
                })
                .unwrap_err();

            assert_eq!(err.field(), field);
            assert_eq!(voucher, before);
        }
    }

    #[test]
    fn test_update_type_accepted_once_scope_matches() {
        let mut voucher = voucher();
        voucher.add_catalogues(&CatalogueInput {
            categories: vec![CategoryId::new(3)],
            ..CatalogueInput::default()
        });

        voucher
            .apply_update(VoucherUpdate {
                voucher_type: Some(VoucherType::Category),
                ..VoucherUpdate::default()
            })
            .unwrap();
        assert_eq!(voucher.voucher_type, VoucherType::Category);
    }

    #[test]
    fn test_negative_zero_counts_as_zero() {
        let negative_zero: Decimal = "-0".parse().unwrap();
        let new = VoucherInput {
            discount_value: negative_zero,
            min_amount_spent: Some(negative_zero),
            ..VoucherInput::default()
        }
        .validate(date(2018, 1, 1), 12);
        assert!(new.is_ok());

        let mut sale = sale();
        sale.apply_update(SaleUpdate {
            value: Some(negative_zero),
            ..SaleUpdate::default()
        })
        .unwrap();
        assert!(sale.value.is_zero());
    }

    #[test]
    fn test_voucher_type_serde() {
        assert_eq!(serde_json::to_string(&VoucherType::Shipping).unwrap(), "\"SHIPPING\"");
        assert_eq!(
            serde_json::from_str::<DiscountValueType>("\"PERCENTAGE\"").unwrap(),
            DiscountValueType::Percentage
        );
    }

    // =========================================================================
    // Sale
    // =========================================================================

    #[test]
    fn test_sale_requires_name() {
        let err = SaleInput {
            name: "   ".to_owned(),
            ..SaleInput::default()
        }
        .validate(date(2018, 1, 1))
        .unwrap_err();
        assert_eq!(err.field(), "name");
    }

    #[test]
    fn test_sale_update_type() {
        let mut sale = sale();
        sale.value = dec(10, 0);
        sale.apply_update(SaleUpdate {
            value_type: Some(DiscountValueType::Percentage),
            ..SaleUpdate::default()
        })
        .unwrap();
        assert_eq!(sale.value_type, DiscountValueType::Percentage);
    }

    #[test]
    fn test_sale_update_rejects_negative_value() {
        let mut sale = sale();
        let err = sale
            .apply_update(SaleUpdate {
                value: Some(dec(-5, 0)),
                ..SaleUpdate::default()
            })
            .unwrap_err();
        assert_eq!(err.field(), "value");
        assert_eq!(sale.value, dec(123, 0));
    }

    #[test]
    fn test_sale_is_active_without_end_date() {
        let sale = sale();
        assert!(sale.is_active(date(2030, 1, 1)));
        assert!(!sale.is_active(date(2017, 1, 1)));
    }
}
