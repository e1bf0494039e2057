//! Address repository.

use sqlx::{FromRow, PgPool};
use tracing::instrument;

use shipquote_core::{AddressId, CountryId, SubdivisionId, UserId};

use super::RepositoryError;
use crate::models::Address;

#[derive(Debug, FromRow)]
struct AddressRow {
    id: i32,
    user_id: Option<i32>,
    street: Option<String>,
    street2: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    subdivision_id: Option<i32>,
    country_id: i32,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user: row.user_id.map(UserId::new),
            street: row.street,
            street2: row.street2,
            city: row.city,
            postal_code: row.postal_code,
            subdivision: row.subdivision_id.map(SubdivisionId::new),
            country: CountryId::new(row.country_id),
        }
    }
}

/// Repository for address lookups.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an address only if it belongs to `user`.
    ///
    /// Ownership is part of the query, so a missing address and someone
    /// else's address are indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user = %user, address = %address))]
    pub async fn get_owned(
        &self,
        user: UserId,
        address: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, street, street2, city, postal_code, subdivision_id, country_id
            FROM storefront.address
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(address)
        .bind(user)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Address::from))
    }

    /// Get an address by id with no ownership check.
    ///
    /// Only for addresses reached through a record the caller already holds,
    /// such as the shipment address of the session's order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn get(&self, address: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, street, street2, city, postal_code, subdivision_id, country_id
            FROM storefront.address
            WHERE id = $1
            ",
        )
        .bind(address)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Address::from))
    }
}
