//! Shipping method configuration.
//!
//! A [`ShippingMethod`] is the shared base record (name, activity, guest and
//! country availability, website) composed with exactly one [`Pricing`]
//! variant. Table rule lines are stored separately and looked up through a
//! [`TableLineSource`](super::TableLineSource).

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::request::{ShippingRequest, normalize_postal_code};
use crate::types::{
    CountryId, MethodKind, ShippingMethodId, SubdivisionId, TableFactor, TableLineId, WebsiteId,
};

/// An administrator-configured shipping option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    /// Name shown to the customer.
    pub name: String,
    pub active: bool,
    pub is_allowed_for_guest: bool,
    pub available_countries: BTreeSet<CountryId>,
    pub website: WebsiteId,
    pub pricing: Pricing,
}

/// Strategy-specific pricing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pricing {
    Flat(FlatRate),
    Free(FreeShipping),
    Table(ShippingTable),
}

/// Fixed price regardless of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRate {
    pub price: Decimal,
}

/// Free once the order total reaches `minimum_order_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeShipping {
    pub minimum_order_value: Decimal,
}

/// Zone and tier pricing from a rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShippingTable {
    pub factor: TableFactor,
}

impl Pricing {
    #[must_use]
    pub const fn kind(&self) -> MethodKind {
        match self {
            Self::Flat(_) => MethodKind::Flat,
            Self::Free(_) => MethodKind::Free,
            Self::Table(_) => MethodKind::Table,
        }
    }
}

impl ShippingMethod {
    /// Create an active, guest-allowed method with no available countries.
    #[must_use]
    pub fn new(
        id: ShippingMethodId,
        name: impl Into<String>,
        website: WebsiteId,
        pricing: Pricing,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
            is_allowed_for_guest: true,
            available_countries: BTreeSet::new(),
            website,
            pricing,
        }
    }

    /// Add countries this method ships to.
    #[must_use]
    pub fn with_countries(mut self, countries: impl IntoIterator<Item = CountryId>) -> Self {
        self.available_countries.extend(countries);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> MethodKind {
        self.pricing.kind()
    }

    /// Shared eligibility check applied before any strategy-specific pricing.
    ///
    /// A method is eligible when it is active, ships to the destination
    /// country, belongs to the requesting website, and either allows guests
    /// or the requester is logged in.
    #[must_use]
    pub fn is_eligible(&self, request: &ShippingRequest) -> bool {
        self.active
            && self.available_countries.contains(&request.country())
            && self.website == request.website
            && (self.is_allowed_for_guest || !request.is_guest)
    }
}

/// One rule of a shipping table.
///
/// Unset `country`, `subdivision` or `postal_code` are wildcards. `threshold`
/// is the inclusive lower bound on the table's comparison factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLine {
    pub id: TableLineId,
    pub table: ShippingMethodId,
    pub country: Option<CountryId>,
    pub subdivision: Option<SubdivisionId>,
    pub postal_code: Option<String>,
    pub threshold: Decimal,
    pub price: Decimal,
}

impl TableLine {
    /// Create a fully wildcarded line (a website-wide default tier).
    #[must_use]
    pub const fn new(
        id: TableLineId,
        table: ShippingMethodId,
        threshold: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            id,
            table,
            country: None,
            subdivision: None,
            postal_code: None,
            threshold,
            price,
        }
    }

    #[must_use]
    pub const fn for_country(mut self, country: CountryId) -> Self {
        self.country = Some(country);
        self
    }

    #[must_use]
    pub const fn for_subdivision(mut self, subdivision: SubdivisionId) -> Self {
        self.subdivision = Some(subdivision);
        self
    }

    #[must_use]
    pub fn for_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = normalize_postal_code(Some(postal_code.into()));
        self
    }

    /// Postal code used for matching, `None` when unset or blank.
    #[must_use]
    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}
