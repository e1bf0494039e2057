//! Turning a chosen quote into an order line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::SelectionError;
use super::quote::RateQuote;
use crate::types::ShippingMethodId;

/// The single shipping line an order carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingLine {
    pub method_id: ShippingMethodId,
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl ShippingLine {
    /// Line for a quote: described as `Shipping (<name>)`, quantity one.
    #[must_use]
    pub fn from_quote(quote: &RateQuote) -> Self {
        Self {
            method_id: quote.method_id,
            description: format!("Shipping ({})", quote.name),
            unit_price: quote.amount,
            quantity: 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Pick `method_id` out of a quoted set.
///
/// Zero-priced quotes still produce a line so that switching to a free
/// method replaces a previously chosen paid one.
///
/// # Errors
///
/// Returns `SelectionError::NotQuoted` if the method is not in `quotes`.
pub fn select_quote(
    quotes: &[RateQuote],
    method_id: ShippingMethodId,
) -> Result<ShippingLine, SelectionError> {
    quotes
        .iter()
        .find(|q| q.method_id == method_id)
        .map(ShippingLine::from_quote)
        .ok_or(SelectionError::NotQuoted(method_id))
}
