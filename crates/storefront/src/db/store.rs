//! Storage seam for the shipping routes.
//!
//! Handlers and the quote service reach the database only through
//! [`CheckoutStore`]. [`PgCheckoutStore`] is the production implementation;
//! tests can supply an in-memory one.

use async_trait::async_trait;
use sqlx::PgPool;

use shipquote_core::{
    AddressId, CountryId, OrderId, ShippingLine, ShippingMethod, ShippingMethodId, TableLine,
    UserId, WebsiteId,
};

use super::RepositoryError;
use super::addresses::AddressRepository;
use super::orders::OrderRepository;
use super::shipping::ShippingRepository;
use crate::models::{Address, Order};

/// Reads and writes needed to quote and confirm shipping.
///
/// Shared across requests behind an `Arc`, hence `Send + Sync`.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Active methods of `website` that ship to `country`, ordered by kind then id.
    async fn eligible_methods(
        &self,
        website: WebsiteId,
        country: CountryId,
    ) -> Result<Vec<ShippingMethod>, RepositoryError>;

    /// Lines of all given tables, ordered by table, threshold descending, id.
    async fn table_lines(
        &self,
        tables: &[ShippingMethodId],
    ) -> Result<Vec<TableLine>, RepositoryError>;

    /// An order with its merchandise total.
    async fn order(&self, order: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// An address, only if it belongs to `user`.
    async fn owned_address(
        &self,
        user: UserId,
        address: AddressId,
    ) -> Result<Option<Address>, RepositoryError>;

    /// An address reached through a record the caller already holds.
    async fn address(&self, address: AddressId) -> Result<Option<Address>, RepositoryError>;

    /// Replace the order's single shipping line, creating it if absent.
    async fn upsert_shipping_line(
        &self,
        order: OrderId,
        line: &ShippingLine,
    ) -> Result<(), RepositoryError>;
}

/// `PostgreSQL` implementation over the storefront repositories.
#[derive(Debug, Clone)]
pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn eligible_methods(
        &self,
        website: WebsiteId,
        country: CountryId,
    ) -> Result<Vec<ShippingMethod>, RepositoryError> {
        ShippingRepository::new(&self.pool)
            .eligible_methods(website, country)
            .await
    }

    async fn table_lines(
        &self,
        tables: &[ShippingMethodId],
    ) -> Result<Vec<TableLine>, RepositoryError> {
        ShippingRepository::new(&self.pool).table_lines(tables).await
    }

    async fn order(&self, order: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get(order).await
    }

    async fn owned_address(
        &self,
        user: UserId,
        address: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        AddressRepository::new(&self.pool)
            .get_owned(user, address)
            .await
    }

    async fn address(&self, address: AddressId) -> Result<Option<Address>, RepositoryError> {
        AddressRepository::new(&self.pool).get(address).await
    }

    async fn upsert_shipping_line(
        &self,
        order: OrderId,
        line: &ShippingLine,
    ) -> Result<(), RepositoryError> {
        OrderRepository::new(&self.pool)
            .upsert_shipping_line(order, line)
            .await
    }
}
