//! Pricing strategies.
//!
//! Each [`MethodKind`] has one [`ShippingStrategy`]. New kinds are added by
//! registering another strategy with the [`StrategyRegistry`]; the
//! aggregator never matches on the kind itself.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::error::ShippingError;
use super::lines::TableLineSource;
use super::matcher::TableMatcher;
use super::method::{FlatRate, FreeShipping, Pricing, ShippingMethod, ShippingTable};
use super::quote::RateQuote;
use super::request::ShippingRequest;
use crate::types::{MethodKind, TableFactor};

/// Inputs shared by every evaluation in one quote call.
#[derive(Clone, Copy)]
pub struct QuoteContext<'a> {
    pub request: &'a ShippingRequest,
    pub lines: &'a dyn TableLineSource,
}

impl<'a> QuoteContext<'a> {
    #[must_use]
    pub const fn new(request: &'a ShippingRequest, lines: &'a dyn TableLineSource) -> Self {
        Self { request, lines }
    }
}

impl std::fmt::Debug for QuoteContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteContext")
            .field("request", self.request)
            .finish_non_exhaustive()
    }
}

/// Prices one kind of shipping method.
pub trait ShippingStrategy: Send + Sync {
    /// The kind this strategy handles.
    fn kind(&self) -> MethodKind;

    /// Price an eligible method, or `None` if it does not apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the method's pricing data cannot be used.
    fn price(
        &self,
        method: &ShippingMethod,
        ctx: &QuoteContext<'_>,
    ) -> Result<Option<Decimal>, ShippingError>;

    /// Eligibility check followed by [`price`](Self::price).
    ///
    /// # Errors
    ///
    /// Propagates errors from [`price`](Self::price).
    fn evaluate(
        &self,
        method: &ShippingMethod,
        ctx: &QuoteContext<'_>,
    ) -> Result<Option<RateQuote>, ShippingError> {
        if !method.is_eligible(ctx.request) {
            return Ok(None);
        }
        Ok(self
            .price(method, ctx)?
            .map(|amount| RateQuote::new(method.id, method.name.clone(), amount)))
    }
}

fn mismatch(method: &ShippingMethod, expected: MethodKind) -> ShippingError {
    ShippingError::KindMismatch {
        method: method.id,
        expected,
        actual: method.kind(),
    }
}

/// Always quotes the configured price.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatRateStrategy;

impl ShippingStrategy for FlatRateStrategy {
    fn kind(&self) -> MethodKind {
        MethodKind::Flat
    }

    fn price(
        &self,
        method: &ShippingMethod,
        _ctx: &QuoteContext<'_>,
    ) -> Result<Option<Decimal>, ShippingError> {
        let Pricing::Flat(FlatRate { price }) = method.pricing else {
            return Err(mismatch(method, MethodKind::Flat));
        };
        Ok(Some(price))
    }
}

/// Quotes zero once the order total reaches the minimum.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeShippingStrategy;

impl ShippingStrategy for FreeShippingStrategy {
    fn kind(&self) -> MethodKind {
        MethodKind::Free
    }

    fn price(
        &self,
        method: &ShippingMethod,
        ctx: &QuoteContext<'_>,
    ) -> Result<Option<Decimal>, ShippingError> {
        let Pricing::Free(FreeShipping {
            minimum_order_value,
        }) = method.pricing
        else {
            return Err(mismatch(method, MethodKind::Free));
        };
        Ok((ctx.request.order_total >= minimum_order_value).then_some(Decimal::ZERO))
    }
}

/// Quotes the price of the best matching rule line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRateStrategy;

impl TableRateStrategy {
    /// Value compared against line thresholds.
    #[must_use]
    pub const fn comparison_value(factor: TableFactor, request: &ShippingRequest) -> Decimal {
        match factor {
            TableFactor::TotalPrice => request.order_total,
        }
    }
}

impl ShippingStrategy for TableRateStrategy {
    fn kind(&self) -> MethodKind {
        MethodKind::Table
    }

    fn price(
        &self,
        method: &ShippingMethod,
        ctx: &QuoteContext<'_>,
    ) -> Result<Option<Decimal>, ShippingError> {
        let Pricing::Table(ShippingTable { factor }) = method.pricing else {
            return Err(mismatch(method, MethodKind::Table));
        };
        let lines = ctx.lines.lines_for(method.id)?;
        let value = Self::comparison_value(factor, ctx.request);
        let matched = TableMatcher::new(lines).best_match(&ctx.request.destination, value);

        if let Some(m) = &matched {
            tracing::trace!(
                method_id = %method.id,
                line_id = %m.line.id,
                specificity = ?m.specificity,
                "Matched table line"
            );
        }
        Ok(matched.map(|m| m.line.price))
    }
}

/// Strategies by method kind.
pub struct StrategyRegistry {
    strategies: HashMap<MethodKind, Box<dyn ShippingStrategy>>,
}

impl StrategyRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with the flat, free and table strategies.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(FlatRateStrategy);
        registry.register(FreeShippingStrategy);
        registry.register(TableRateStrategy);
        registry
    }

    /// Register a strategy, replacing any previous one for the same kind.
    pub fn register<S: ShippingStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.insert(strategy.kind(), Box::new(strategy));
    }

    #[must_use]
    pub fn get(&self, kind: MethodKind) -> Option<&dyn ShippingStrategy> {
        self.strategies.get(&kind).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.strategies.keys().collect();
        kinds.sort_by_key(|k| k.as_str());
        f.debug_struct("StrategyRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
