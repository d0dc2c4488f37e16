//! User repository for database operations.
//!
//! This module stores users and their address books. Loading a user always
//! loads the whole book, since every address book rule needs it.
//!
//! Queries are checked at runtime (`sqlx::query`/`query_as`) rather than with
//! the compile-time macros, so the crate builds without a live database.

use sqlx::{PgConnection, PgPool};

use storekeep_core::{
    AccountChange, Address, AddressBook, AddressData, AddressId, AddressType, User, UserId,
};

use super::RepositoryError;

const SELECT_USER: &str = r"
    SELECT id, first_name, last_name, default_billing_address_id, default_shipping_address_id
    FROM storefront.user
    WHERE id = $1
";

const SELECT_USER_FOR_UPDATE: &str = r"
    SELECT id, first_name, last_name, default_billing_address_id, default_shipping_address_id
    FROM storefront.user
    WHERE id = $1
    FOR UPDATE
";

const SELECT_ADDRESSES: &str = r"
    SELECT id, first_name, last_name, company_name, street_address_1, street_address_2,
           city, city_area, postal_code, country, country_area, phone
    FROM storefront.address
    WHERE user_id = $1
    ORDER BY created_at, id
";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    first_name: String,
    last_name: String,
    default_billing_address_id: Option<AddressId>,
    default_shipping_address_id: Option<AddressId>,
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    first_name: String,
    last_name: String,
    company_name: String,
    street_address_1: String,
    street_address_2: String,
    city: String,
    city_area: String,
    postal_code: String,
    country: String,
    country_area: String,
    phone: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self::new(
            row.id,
            AddressData {
                first_name: row.first_name,
                last_name: row.last_name,
                company_name: row.company_name,
                street_address_1: row.street_address_1,
                street_address_2: row.street_address_2,
                city: row.city,
                city_area: row.city_area,
                postal_code: row.postal_code,
                country: row.country,
                country_area: row.country_area,
                phone: row.phone,
            },
        )
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user, with their address book, by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a default pointer is dangling.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_user(&mut conn, id, SELECT_USER).await
    }

    /// Create a new user with an empty address book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, first_name: &str, last_name: &str) -> Result<User, RepositoryError> {
        let id: UserId = sqlx::query_scalar(
            r"
            INSERT INTO storefront.user (first_name, last_name)
            VALUES ($1, $2)
            RETURNING id
            ",
        )
        .bind(first_name)
        .bind(last_name)
        .fetch_one(self.pool)
        .await?;

        Ok(User::new(id).with_names(first_name, last_name))
    }

    /// Update a user's own first and last name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_names(
        &self,
        id: UserId,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.user
            SET first_name = $2, last_name = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Load a user and lock their row until the surrounding transaction ends.
///
/// Concurrent address book operations on the same user serialize on this lock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
/// Returns `RepositoryError::DataCorruption` if a default pointer is dangling.
pub async fn lock_user(conn: &mut PgConnection, id: UserId) -> Result<Option<User>, RepositoryError> {
    load_user(conn, id, SELECT_USER_FOR_UPDATE).await
}

/// Persist the changes reported by an address book operation, in order.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if an inserted address duplicates an
/// existing entry of the same user.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn apply_changes(
    conn: &mut PgConnection,
    user_id: UserId,
    changes: &[AccountChange],
) -> Result<(), RepositoryError> {
    for change in changes {
        match change {
            AccountChange::AddressCreated(address) => insert_address(conn, user_id, address).await?,
            AccountChange::AddressDeleted { address_id } => {
                sqlx::query("DELETE FROM storefront.address WHERE id = $1 AND user_id = $2")
                    .bind(address_id)
                    .bind(user_id)
                    .execute(&mut *conn)
                    .await?;
            }
            AccountChange::DefaultAddressSet {
                address_type,
                address_id,
            } => {
                let sql = match address_type {
                    AddressType::Billing => {
                        "UPDATE storefront.user SET default_billing_address_id = $2, updated_at = NOW() WHERE id = $1"
                    }
                    AddressType::Shipping => {
                        "UPDATE storefront.user SET default_shipping_address_id = $2, updated_at = NOW() WHERE id = $1"
                    }
                };
                sqlx::query(sql)
                    .bind(user_id)
                    .bind(address_id)
                    .execute(&mut *conn)
                    .await?;
            }
        }
    }
    Ok(())
}

async fn load_user(
    conn: &mut PgConnection,
    id: UserId,
    select_user: &str,
) -> Result<Option<User>, RepositoryError> {
    let Some(row) = sqlx::query_as::<_, UserRow>(select_user)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let addresses = sqlx::query_as::<_, AddressRow>(SELECT_ADDRESSES)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    let book = AddressBook::from_addresses(addresses.into_iter().map(Address::from));

    User::from_parts(
        row.id,
        row.first_name,
        row.last_name,
        book,
        row.default_billing_address_id,
        row.default_shipping_address_id,
    )
    .map(Some)
    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

async fn insert_address(
    conn: &mut PgConnection,
    user_id: UserId,
    address: &Address,
) -> Result<(), RepositoryError> {
    let data = &address.data;
    sqlx::query(
        r"
        INSERT INTO storefront.address (
            id, user_id, first_name, last_name, company_name, street_address_1,
            street_address_2, city, city_area, postal_code, country, country_area, phone
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ",
    )
    .bind(address.id)
    .bind(user_id)
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.company_name)
    .bind(&data.street_address_1)
    .bind(&data.street_address_2)
    .bind(&data.city)
    .bind(&data.city_area)
    .bind(&data.postal_code)
    .bind(&data.country)
    .bind(&data.country_area)
    .bind(&data.phone)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict("address already in address book".to_owned());
        }
        RepositoryError::Database(e)
    })?;
    Ok(())
}
