//! Orders as seen by the shipping flow.

use rust_decimal::Decimal;
use thiserror::Error;

use shipquote_core::{AddressId, OrderId, UserId, WebsiteId};

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Draft,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Error)]
#[error("invalid order state: {0}")]
pub struct InvalidOrderState(String);

impl std::str::FromStr for OrderState {
    type Err = InvalidOrderState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(InvalidOrderState(other.to_string())),
        }
    }
}

/// An order and the figures shipping is priced against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub website: WebsiteId,
    pub user: Option<UserId>,
    pub shipment_address: Option<AddressId>,
    pub state: OrderState,
    /// Merchandise total, excluding any shipping line.
    pub total: Decimal,
}

impl Order {
    /// Only draft orders may change shipping.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.state == OrderState::Draft
    }
}
