//! Order repository.
//!
//! The shipping engine only needs an order's total, owner and shipment
//! address, plus the ability to replace its single shipping line.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use shipquote_core::{AddressId, OrderId, ShippingLine, UserId, WebsiteId};

use super::RepositoryError;
use crate::models::{Order, OrderState};

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i32,
    website_id: i32,
    user_id: Option<i32>,
    shipment_address_id: Option<i32>,
    state: String,
    total: Decimal,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let state: OrderState = row.state.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;
        Ok(Self {
            id: OrderId::new(row.id),
            website: WebsiteId::new(row.website_id),
            user: row.user_id.map(UserId::new),
            shipment_address: row.shipment_address_id.map(AddressId::new),
            state,
            total: row.total,
        })
    }
}

/// Repository for order reads and shipping line updates.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order with its merchandise total (shipping line excluded).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored state is unknown.
    #[instrument(skip(self), fields(order = %order))]
    pub async fn get(&self, order: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.website_id, o.user_id, o.shipment_address_id, o.state,
                   COALESCE(SUM(l.quantity * l.unit_price) FILTER (WHERE NOT l.is_shipping_line), 0)::NUMERIC AS total
            FROM storefront.sale_order o
            LEFT JOIN storefront.sale_order_line l ON l.order_id = o.id
            WHERE o.id = $1
            GROUP BY o.id
            ",
        )
        .bind(order)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// Replace the order's shipping line, creating it if absent.
    ///
    /// Runs in one transaction with the order row locked, so concurrent
    /// selections leave exactly one shipping line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, line), fields(order = %order, method_id = %line.method_id))]
    pub async fn upsert_shipping_line(
        &self,
        order: OrderId,
        line: &ShippingLine,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i32> =
            sqlx::query_scalar("SELECT id FROM storefront.sale_order WHERE id = $1 FOR UPDATE")
                .bind(order)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let updated: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE storefront.sale_order_line
            SET description = $2, unit_price = $3, quantity = $4, shipping_method_id = $5
            WHERE order_id = $1 AND is_shipping_line
            RETURNING id
            ",
        )
        .bind(order)
        .bind(&line.description)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(line.method_id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            sqlx::query(
                r"
                INSERT INTO storefront.sale_order_line
                    (order_id, description, quantity, unit_price, is_shipping_line, shipping_method_id)
                VALUES ($1, $2, $3, $4, TRUE, $5)
                ",
            )
            .bind(order)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.method_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE storefront.sale_order SET updated_at = NOW() WHERE id = $1")
            .bind(order)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(created = updated.is_none(), "Shipping line saved");
        Ok(())
    }
}
