//! Shipping method repository.
//!
//! Reads are batched: one query for every eligible method of a
//! (website, country) pair, one query for the lines of all their tables.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::instrument;

use shipquote_core::{
    CountryId, FlatRate, FreeShipping, MethodKind, Pricing, ShippingMethod, ShippingMethodId,
    ShippingTable, SubdivisionId, TableFactor, TableLine, TableLineId, WebsiteId,
};

use super::RepositoryError;

/// Base columns joined with whichever pricing row the method has.
#[derive(Debug, FromRow)]
struct MethodRow {
    id: i32,
    name: String,
    kind: String,
    active: bool,
    is_allowed_for_guest: bool,
    website_id: i32,
    flat_price: Option<Decimal>,
    free_minimum: Option<Decimal>,
    table_factor: Option<String>,
    countries: Vec<i32>,
}

impl TryFrom<MethodRow> for ShippingMethod {
    type Error = RepositoryError;

    fn try_from(row: MethodRow) -> Result<Self, Self::Error> {
        let kind: MethodKind = row.kind.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("shipping method {}: {e}", row.id))
        })?;
        let missing = || {
            RepositoryError::DataCorruption(format!(
                "shipping method {} is {kind} but has no {kind} pricing row",
                row.id
            ))
        };

        let pricing = match kind {
            MethodKind::Flat => Pricing::Flat(FlatRate {
                price: row.flat_price.ok_or_else(missing)?,
            }),
            MethodKind::Free => Pricing::Free(FreeShipping {
                minimum_order_value: row.free_minimum.ok_or_else(missing)?,
            }),
            MethodKind::Table => {
                let factor: TableFactor = row
                    .table_factor
                    .as_deref()
                    .ok_or_else(missing)?
                    .parse()
                    .map_err(|e| {
                        RepositoryError::DataCorruption(format!("shipping method {}: {e}", row.id))
                    })?;
                Pricing::Table(ShippingTable { factor })
            }
        };

        Ok(Self {
            id: ShippingMethodId::new(row.id),
            name: row.name,
            active: row.active,
            is_allowed_for_guest: row.is_allowed_for_guest,
            available_countries: row.countries.into_iter().map(CountryId::new).collect(),
            website: WebsiteId::new(row.website_id),
            pricing,
        })
    }
}

#[derive(Debug, FromRow)]
struct TableLineRow {
    id: i32,
    table_id: i32,
    country_id: Option<i32>,
    subdivision_id: Option<i32>,
    postal_code: Option<String>,
    threshold: Decimal,
    price: Decimal,
}

impl From<TableLineRow> for TableLine {
    fn from(row: TableLineRow) -> Self {
        Self {
            id: TableLineId::new(row.id),
            table: ShippingMethodId::new(row.table_id),
            country: row.country_id.map(CountryId::new),
            subdivision: row.subdivision_id.map(SubdivisionId::new),
            postal_code: row.postal_code,
            threshold: row.threshold,
            price: row.price,
        }
    }
}

/// A shipping method to be created.
#[derive(Debug, Clone)]
pub struct NewShippingMethod {
    pub name: String,
    pub active: bool,
    pub is_allowed_for_guest: bool,
    pub website: WebsiteId,
    pub pricing: Pricing,
    pub countries: BTreeSet<CountryId>,
}

/// A table line to be created.
#[derive(Debug, Clone)]
pub struct NewTableLine {
    pub country: Option<CountryId>,
    pub subdivision: Option<SubdivisionId>,
    pub postal_code: Option<String>,
    pub threshold: Decimal,
    pub price: Decimal,
}

/// Repository for shipping configuration.
pub struct ShippingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShippingRepository<'a> {
    /// Create a new shipping repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active methods of `website` that ship to `country`.
    ///
    /// Ordered by kind in registration order (flat, free, table), then by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a method's pricing row is missing.
    #[instrument(skip(self), fields(website = %website, country = %country))]
    pub async fn eligible_methods(
        &self,
        website: WebsiteId,
        country: CountryId,
    ) -> Result<Vec<ShippingMethod>, RepositoryError> {
        let kind_order: Vec<&str> = MethodKind::ALL.iter().map(MethodKind::as_str).collect();

        let rows = sqlx::query_as::<_, MethodRow>(
            r"
            SELECT m.id, m.name, m.kind, m.active, m.is_allowed_for_guest, m.website_id,
                   f.price AS flat_price,
                   fr.minimum_order_value AS free_minimum,
                   t.factor AS table_factor,
                   ARRAY_AGG(c.country_id ORDER BY c.country_id) AS countries
            FROM storefront.shipping_method m
            JOIN storefront.shipping_method_country c ON c.method_id = m.id
            LEFT JOIN storefront.shipping_method_flat f ON f.method_id = m.id
            LEFT JOIN storefront.shipping_method_free fr ON fr.method_id = m.id
            LEFT JOIN storefront.shipping_method_table t ON t.method_id = m.id
            WHERE m.website_id = $1
              AND m.active
              AND EXISTS (
                  SELECT 1 FROM storefront.shipping_method_country x
                  WHERE x.method_id = m.id AND x.country_id = $2
              )
            GROUP BY m.id, f.price, fr.minimum_order_value, t.factor
            ORDER BY array_position($3::text[], m.kind), m.id
            ",
        )
        .bind(website)
        .bind(country)
        .bind(&kind_order)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ShippingMethod::try_from).collect()
    }

    /// Lines of all given tables, ordered by table, threshold descending, id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(tables = tables.len()))]
    pub async fn table_lines(
        &self,
        tables: &[ShippingMethodId],
    ) -> Result<Vec<TableLine>, RepositoryError> {
        if tables.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = tables.iter().map(ShippingMethodId::as_i32).collect();

        let rows = sqlx::query_as::<_, TableLineRow>(
            r"
            SELECT id, table_id, country_id, subdivision_id, postal_code, threshold, price
            FROM storefront.shipping_table_line
            WHERE table_id = ANY($1)
            ORDER BY table_id, threshold DESC, id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(TableLine::from).collect())
    }
}

// =============================================================================
// Writes (seeding)
// =============================================================================

/// Delete every shipping method of `website`. Returns the number removed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn delete_website_methods(
    conn: &mut PgConnection,
    website: WebsiteId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM storefront.shipping_method WHERE website_id = $1")
        .bind(website)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Insert a method, its pricing row and its countries.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails.
#[instrument(skip(conn, method), fields(name = %method.name, kind = %method.pricing.kind()))]
pub async fn insert_method(
    conn: &mut PgConnection,
    method: &NewShippingMethod,
) -> Result<ShippingMethodId, RepositoryError> {
    let id: ShippingMethodId = sqlx::query_scalar(
        r"
        INSERT INTO storefront.shipping_method (name, kind, active, is_allowed_for_guest, website_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(&method.name)
    .bind(method.pricing.kind().as_str())
    .bind(method.active)
    .bind(method.is_allowed_for_guest)
    .bind(method.website)
    .fetch_one(&mut *conn)
    .await?;

    match method.pricing {
        Pricing::Flat(FlatRate { price }) => {
            sqlx::query("INSERT INTO storefront.shipping_method_flat (method_id, price) VALUES ($1, $2)")
                .bind(id)
                .bind(price)
                .execute(&mut *conn)
                .await?;
        }
        Pricing::Free(FreeShipping {
            minimum_order_value,
        }) => {
            sqlx::query(
                "INSERT INTO storefront.shipping_method_free (method_id, minimum_order_value) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(minimum_order_value)
            .execute(&mut *conn)
            .await?;
        }
        Pricing::Table(ShippingTable { factor }) => {
            sqlx::query("INSERT INTO storefront.shipping_method_table (method_id, factor) VALUES ($1, $2)")
                .bind(id)
                .bind(factor.as_str())
                .execute(&mut *conn)
                .await?;
        }
    }

    let countries: Vec<i32> = method.countries.iter().map(CountryId::as_i32).collect();
    sqlx::query(
        r"
        INSERT INTO storefront.shipping_method_country (method_id, country_id)
        SELECT $1, UNNEST($2::int4[])
        ",
    )
    .bind(id)
    .bind(&countries)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

/// Insert one line into a table method.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if an identical line already exists.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert_table_line(
    conn: &mut PgConnection,
    table: ShippingMethodId,
    line: &NewTableLine,
) -> Result<TableLineId, RepositoryError> {
    sqlx::query_scalar(
        r"
        INSERT INTO storefront.shipping_table_line
            (table_id, country_id, subdivision_id, postal_code, threshold, price)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(table)
    .bind(line.country)
    .bind(line.subdivision)
    .bind(line.postal_code.as_deref())
    .bind(line.threshold)
    .bind(line.price)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "table line"))
}
