//! Fan-out over configured methods.

use rust_decimal::Decimal;
use tracing::instrument;

use super::lines::TableLineSource;
use super::method::ShippingMethod;
use super::quote::RateQuote;
use super::request::ShippingRequest;
use super::strategy::{QuoteContext, StrategyRegistry};

/// Evaluates every configured method and collects the quotes that apply.
///
/// A method that fails to evaluate is logged and left out; it never aborts
/// the listing for the others.
#[derive(Debug, Default)]
pub struct RateAggregator {
    registry: StrategyRegistry,
}

impl RateAggregator {
    #[must_use]
    pub const fn new(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    #[must_use]
    pub const fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Quotes for `request`, in the order `methods` are given.
    ///
    /// Callers pass methods grouped by kind in registration order (flat, free,
    /// table), ordered by id within each kind.
    #[instrument(skip_all, fields(country = %request.country(), guest = request.is_guest, methods = methods.len()))]
    pub fn aggregate(
        &self,
        request: &ShippingRequest,
        methods: &[ShippingMethod],
        lines: &dyn TableLineSource,
    ) -> Vec<RateQuote> {
        let ctx = QuoteContext::new(request, lines);
        let quotes: Vec<RateQuote> = methods
            .iter()
            .filter_map(|method| self.evaluate_one(method, &ctx))
            .collect();
        tracing::debug!(quotes = quotes.len(), "Aggregated shipping quotes");
        quotes
    }

    /// Same result as [`aggregate`](Self::aggregate), evaluated on the rayon pool.
    ///
    /// Output order still follows `methods`.
    #[cfg(feature = "parallel")]
    #[instrument(skip_all, fields(country = %request.country(), guest = request.is_guest, methods = methods.len()))]
    pub fn aggregate_parallel(
        &self,
        request: &ShippingRequest,
        methods: &[ShippingMethod],
        lines: &dyn TableLineSource,
    ) -> Vec<RateQuote> {
        use rayon::prelude::*;

        let ctx = QuoteContext::new(request, lines);
        let slots: Vec<Option<RateQuote>> = methods
            .par_iter()
            .map(|method| self.evaluate_one(method, &ctx))
            .collect();
        let quotes: Vec<RateQuote> = slots.into_iter().flatten().collect();
        tracing::debug!(quotes = quotes.len(), "Aggregated shipping quotes");
        quotes
    }

    fn evaluate_one(&self, method: &ShippingMethod, ctx: &QuoteContext<'_>) -> Option<RateQuote> {
        let kind = method.kind();
        let Some(strategy) = self.registry.get(kind) else {
            tracing::warn!(method_id = %method.id, %kind, "No strategy registered for shipping method");
            return None;
        };

        match strategy.evaluate(method, ctx) {
            Ok(Some(quote)) if quote.amount < Decimal::ZERO => {
                tracing::error!(
                    method_id = %method.id,
                    %kind,
                    amount = %quote.amount,
                    "Discarding negative shipping quote"
                );
                None
            }
            Ok(Some(quote)) => {
                tracing::debug!(method_id = %method.id, %kind, amount = %quote.amount, "Quoted");
                Some(quote)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(method_id = %method.id, %kind, error = %e, "Shipping method evaluation failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shipping::error::ShippingError;
    use crate::shipping::lines::LineIndex;
    use crate::shipping::method::{FlatRate, FreeShipping, Pricing, ShippingTable, TableLine};
    use crate::shipping::request::Destination;
    use crate::shipping::strategy::ShippingStrategy;
    use crate::types::{CountryId, MethodKind, ShippingMethodId, TableLineId, WebsiteId};

    const US: CountryId = CountryId::new(1);
    const WEB: WebsiteId = WebsiteId::new(1);

    fn method(id: i32, name: &str, pricing: Pricing) -> ShippingMethod {
        ShippingMethod::new(ShippingMethodId::new(id), name, WEB, pricing).with_countries([US])
    }

    fn flat(id: i32, name: &str, price: i64) -> ShippingMethod {
        method(id, name, Pricing::Flat(FlatRate { price: Decimal::new(price, 0) }))
    }

    fn request(total: i64) -> ShippingRequest {
        ShippingRequest::new(Destination::new(US), WEB, Decimal::new(total, 0))
    }

    #[test]
    fn test_flat_and_free_both_quoted_in_order() {
        let methods = vec![
            flat(1, "Standard", 10),
            method(
                2,
                "Free",
                Pricing::Free(FreeShipping {
                    minimum_order_value: Decimal::new(100, 0),
                }),
            ),
        ];
        let quotes = RateAggregator::default().aggregate(&request(150), &methods, &LineIndex::new());
        let names: Vec<_> = quotes.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, ["Standard", "Free"]);
        assert_eq!(quotes[1].amount, Decimal::ZERO);
    }

    #[test]
    fn test_free_below_threshold_is_omitted() {
        let methods = vec![
            flat(1, "Standard", 10),
            method(
                2,
                "Free",
                Pricing::Free(FreeShipping {
                    minimum_order_value: Decimal::new(100, 0),
                }),
            ),
        ];
        let quotes = RateAggregator::default().aggregate(&request(50), &methods, &LineIndex::new());
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].method_id, ShippingMethodId::new(1));
    }

    #[test]
    fn test_failing_table_does_not_hide_others() {
        let table = method(3, "Zones", Pricing::Table(ShippingTable::default()));
        let mut lines = LineIndex::new();
        lines.mark_unavailable(table.id, "connection reset");
        let methods = vec![flat(1, "Standard", 10), table];

        let quotes = RateAggregator::default().aggregate(&request(50), &methods, &lines);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].name, "Standard");
    }

    #[test]
    fn test_negative_amount_is_dropped() {
        let table = method(3, "Zones", Pricing::Table(ShippingTable::default()));
        let lines = LineIndex::from_lines([TableLine::new(
            TableLineId::new(1),
            table.id,
            Decimal::ZERO,
            Decimal::new(-5, 0),
        )
        .for_country(US)]);
        let quotes = RateAggregator::default().aggregate(&request(50), &[table], &lines);
        assert!(quotes.is_empty());
    }

    #[test]
    fn test_unregistered_kind_is_skipped() {
        let mut registry = StrategyRegistry::empty();
        registry.register(crate::shipping::strategy::FlatRateStrategy);
        let methods = vec![
            method(
                2,
                "Free",
                Pricing::Free(FreeShipping {
                    minimum_order_value: Decimal::ZERO,
                }),
            ),
            flat(1, "Standard", 10),
        ];
        let quotes = RateAggregator::new(registry).aggregate(&request(50), &methods, &LineIndex::new());
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].name, "Standard");
    }

    #[test]
    fn test_strategy_error_is_contained() {
        struct Broken;
        impl ShippingStrategy for Broken {
            fn kind(&self) -> MethodKind {
                MethodKind::Flat
            }
            fn price(
                &self,
                method: &ShippingMethod,
                _ctx: &QuoteContext<'_>,
            ) -> Result<Option<Decimal>, ShippingError> {
                Err(ShippingError::LinesUnavailable {
                    table: method.id,
                    reason: "boom".into(),
                })
            }
        }

        let mut registry = StrategyRegistry::builtin();
        registry.register(Broken);
        let methods = vec![
            flat(1, "Standard", 10),
            method(
                2,
                "Free",
                Pricing::Free(FreeShipping {
                    minimum_order_value: Decimal::ZERO,
                }),
            ),
        ];
        let quotes = RateAggregator::new(registry).aggregate(&request(50), &methods, &LineIndex::new());
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].name, "Free");
    }

    #[test]
    fn test_guest_sees_only_guest_methods() {
        let mut members_only = flat(2, "Members", 5);
        members_only.is_allowed_for_guest = false;
        let methods = vec![flat(1, "Standard", 10), members_only];
        let aggregator = RateAggregator::default();

        let guest = aggregator.aggregate(&request(50).as_guest(), &methods, &LineIndex::new());
        assert_eq!(guest.len(), 1);
        let member = aggregator.aggregate(&request(50), &methods, &LineIndex::new());
        assert_eq!(member.len(), 2);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let methods: Vec<_> = (1..=32).map(|i| flat(i, &format!("m{i}"), i64::from(i))).collect();
        let aggregator = RateAggregator::default();
        let req = request(50);
        let lines = LineIndex::new();
        assert_eq!(
            aggregator.aggregate_parallel(&req, &methods, &lines),
            aggregator.aggregate(&req, &methods, &lines)
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn methods() -> impl Strategy<Value = Vec<ShippingMethod>> {
            prop::collection::vec((0i64..50, any::<bool>(), any::<bool>()), 0..10).prop_map(|specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (price, guest_ok, active))| {
                        let id = i32::try_from(i).unwrap();
                        let mut m = flat(id, &format!("m{id}"), price);
                        m.is_allowed_for_guest = guest_ok;
                        m.active = active;
                        m
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn prop_aggregate_is_idempotent(methods in methods(), total in 0i64..500) {
                let aggregator = RateAggregator::default();
                let req = request(total);
                let lines = LineIndex::new();
                prop_assert_eq!(
                    aggregator.aggregate(&req, &methods, &lines),
                    aggregator.aggregate(&req, &methods, &lines)
                );
            }

            #[test]
            fn prop_guest_quotes_are_subset_of_member_quotes(methods in methods(), total in 0i64..500) {
                let aggregator = RateAggregator::default();
                let lines = LineIndex::new();
                let guest = aggregator.aggregate(&request(total).as_guest(), &methods, &lines);
                let member = aggregator.aggregate(&request(total), &methods, &lines);
                for quote in &guest {
                    prop_assert!(member.contains(quote));
                }
                for quote in &guest {
                    let m = methods.iter().find(|m| m.id == quote.method_id).unwrap();
                    prop_assert!(m.is_allowed_for_guest);
                }
            }
        }
    }
}
