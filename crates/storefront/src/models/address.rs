//! Customer addresses.

use shipquote_core::{AddressId, CountryId, Destination, SubdivisionId, UserId};
use shipquote_core::shipping::request::normalize_postal_code;

/// A stored shipping address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: AddressId,
    /// Owner; `None` for addresses entered during guest checkout.
    pub user: Option<UserId>,
    pub street: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub subdivision: Option<SubdivisionId>,
    pub country: CountryId,
}

impl Address {
    /// The destination this address describes.
    #[must_use]
    pub fn to_destination(&self) -> Destination {
        Destination {
            street: self.street.clone(),
            street2: self.street2.clone(),
            city: self.city.clone(),
            postal_code: normalize_postal_code(self.postal_code.clone()),
            subdivision: self.subdivision,
            country: self.country,
        }
    }
}
