//! Priced shipping options and the cached quote set.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::request::Destination;
use crate::types::ShippingMethodId;

/// One priced shipping option.
///
/// `amount` is never negative; the aggregator drops any quote that would be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub method_id: ShippingMethodId,
    pub name: String,
    pub amount: Decimal,
}

impl RateQuote {
    #[must_use]
    pub fn new(method_id: ShippingMethodId, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            method_id,
            name: name.into(),
            amount,
        }
    }

    /// Boundary row `[method_id, name, amount]` with the amount as a float.
    #[must_use]
    pub fn to_row(&self) -> QuoteRow {
        // Every Decimal fits an f64 (with rounding), so the fallback is unreachable.
        QuoteRow(
            self.method_id,
            self.name.clone(),
            self.amount.to_f64().unwrap_or_default(),
        )
    }
}

/// Serialized as a JSON array: `[id, "name", 10.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow(pub ShippingMethodId, pub String, pub f64);

/// The last computed quote list, kept in the session for the confirm step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSet {
    pub quotes: Vec<RateQuote>,
    pub destination: Destination,
    /// Order total the quotes were computed against.
    pub order_total: Decimal,
    pub quoted_at: DateTime<Utc>,
}

impl QuoteSet {
    #[must_use]
    pub const fn new(
        quotes: Vec<RateQuote>,
        destination: Destination,
        order_total: Decimal,
        quoted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            quotes,
            destination,
            order_total,
            quoted_at,
        }
    }

    /// Look up a quote by method.
    #[must_use]
    pub fn find(&self, method_id: ShippingMethodId) -> Option<&RateQuote> {
        self.quotes.iter().find(|q| q.method_id == method_id)
    }

    /// Whether the set may still be trusted at `now` for an order shipping
    /// to `destination` with `order_total`.
    ///
    /// A set goes stale after `ttl`, as soon as the order total differs from
    /// the one it was priced against, or when it was priced for another zone.
    #[must_use]
    pub fn is_valid_for(
        &self,
        destination: &Destination,
        order_total: Decimal,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> bool {
        self.destination.same_zone(destination)
            && self.order_total == order_total
            && now.signed_duration_since(self.quoted_at) <= ttl
    }

    #[must_use]
    pub fn to_result_rows(&self) -> Vec<QuoteRow> {
        self.quotes.iter().map(RateQuote::to_row).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::CountryId;

    fn set_at(quoted_at: DateTime<Utc>) -> QuoteSet {
        QuoteSet::new(
            vec![
                RateQuote::new(ShippingMethodId::new(1), "Flat", Decimal::new(1000, 2)),
                RateQuote::new(ShippingMethodId::new(2), "Free", Decimal::ZERO),
            ],
            Destination::new(CountryId::new(1)),
            Decimal::new(150, 0),
            quoted_at,
        )
    }

    #[test]
    fn test_row_serializes_as_array() {
        let quote = RateQuote::new(ShippingMethodId::new(4), "Express", Decimal::new(1000, 2));
        let json = serde_json::to_string(&quote.to_row()).unwrap();
        assert_eq!(json, r#"[4,"Express",10.0]"#);
    }

    #[test]
    fn test_find() {
        let set = set_at(Utc::now());
        assert_eq!(set.find(ShippingMethodId::new(2)).unwrap().name, "Free");
        assert!(set.find(ShippingMethodId::new(3)).is_none());
    }

    fn home() -> Destination {
        Destination::new(CountryId::new(1))
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let set = set_at(now - Duration::minutes(5));
        let total = Decimal::new(150, 0);
        assert!(set.is_valid_for(&home(), total, now, Duration::minutes(15)));
        assert!(!set.is_valid_for(&home(), total, now, Duration::minutes(1)));
    }

    #[test]
    fn test_changed_total_invalidates() {
        let now = Utc::now();
        let set = set_at(now);
        assert!(!set.is_valid_for(&home(), Decimal::new(90, 0), now, Duration::minutes(15)));
    }

    #[test]
    fn test_other_country_invalidates() {
        let now = Utc::now();
        let set = set_at(now);
        let abroad = Destination::new(CountryId::new(99));
        assert!(!set.is_valid_for(&abroad, Decimal::new(150, 0), now, Duration::minutes(15)));
    }

    #[test]
    fn test_other_subdivision_or_zip_invalidates() {
        let now = Utc::now();
        let set = set_at(now);
        let total = Decimal::new(150, 0);
        let ttl = Duration::minutes(15);
        let region = home().with_subdivision(crate::types::SubdivisionId::new(4));
        let zipped = home().with_postal_code("560001");
        assert!(!set.is_valid_for(&region, total, now, ttl));
        assert!(!set.is_valid_for(&zipped, total, now, ttl));
    }

    #[test]
    fn test_street_and_city_do_not_invalidate() {
        let now = Utc::now();
        let set = set_at(now);
        let mut moved = home().with_postal_code("  ");
        moved.street = Some("2 Side St".to_string());
        moved.city = Some("Shelbyville".to_string());
        assert!(set.is_valid_for(&moved, Decimal::new(150, 0), now, Duration::minutes(15)));
    }

    #[test]
    fn test_session_round_trip_keeps_order() {
        let set = set_at(Utc::now());
        let json = serde_json::to_value(&set).unwrap();
        let back: QuoteSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }
}
