//! Per-quote request types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CountryId, SubdivisionId, WebsiteId};

/// Where the order ships to.
///
/// Street and city are carried through untouched; only country, subdivision
/// and postal code take part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub street: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub subdivision: Option<SubdivisionId>,
    pub country: CountryId,
}

impl Destination {
    /// Create a destination with only the country set.
    #[must_use]
    pub const fn new(country: CountryId) -> Self {
        Self {
            street: None,
            street2: None,
            city: None,
            postal_code: None,
            subdivision: None,
            country,
        }
    }

    /// Set the subdivision (state, province, region).
    #[must_use]
    pub const fn with_subdivision(mut self, subdivision: SubdivisionId) -> Self {
        self.subdivision = Some(subdivision);
        self
    }

    /// Set the postal code. Blank codes are stored as unset.
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
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

    /// Whether `other` falls in the same pricing zone.
    ///
    /// Compares only the fields table matching reads: country, subdivision
    /// and postal code. Street and city never change a price.
    #[must_use]
    pub fn same_zone(&self, other: &Self) -> bool {
        self.country == other.country
            && self.subdivision == other.subdivision
            && self.postal_code() == other.postal_code()
    }
}

/// Trim a postal code and collapse blank values to `None`.
///
/// Blank and unset are the same thing to the table matcher: a wildcard.
#[must_use]
pub fn normalize_postal_code(code: Option<String>) -> Option<String> {
    code.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty())
}

/// Everything a strategy needs to price one shipping method.
///
/// Built once per quote call. `order_total` is a snapshot taken before
/// evaluation starts and is never re-read during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRequest {
    pub destination: Destination,
    pub is_guest: bool,
    pub website: WebsiteId,
    pub order_total: Decimal,
}

impl ShippingRequest {
    /// Create a request for an authenticated customer.
    #[must_use]
    pub const fn new(destination: Destination, website: WebsiteId, order_total: Decimal) -> Self {
        Self {
            destination,
            is_guest: false,
            website,
            order_total,
        }
    }

    /// Mark the requester as a guest (not logged in).
    #[must_use]
    pub const fn as_guest(mut self) -> Self {
        self.is_guest = true;
        self
    }

    #[must_use]
    pub const fn country(&self) -> CountryId {
        self.destination.country
    }
}
