//! Shipping rate resolution.
//!
//! # Flow
//!
//! ```text
//! ShippingRequest ──► RateAggregator ──► StrategyRegistry[kind] ──► RateQuote?
//!                          │                    │
//!                          │                    └─ Table ──► TableMatcher ──► TableLine
//!                          └─ ordered Vec<RateQuote> ──► QuoteSet (session cache)
//! ```
//!
//! Every strategy first applies the shared eligibility check
//! ([`ShippingMethod::is_eligible`]); an ineligible method, or a table with no
//! matching line, simply produces no quote.

pub mod aggregate;
pub mod error;
pub mod lines;
pub mod matcher;
pub mod method;
pub mod quote;
pub mod request;
pub mod selection;
pub mod strategy;

pub use aggregate::RateAggregator;
pub use error::{SelectionError, ShippingError};
pub use lines::{DuplicateLine, LineIndex, TableLineSource, find_duplicate_lines};
pub use matcher::{Specificity, TableMatch, TableMatcher};
pub use method::{FlatRate, FreeShipping, Pricing, ShippingMethod, ShippingTable, TableLine};
pub use quote::{QuoteRow, QuoteSet, RateQuote};
pub use request::{Destination, ShippingRequest};
pub use selection::{ShippingLine, select_quote};
pub use strategy::{
    FlatRateStrategy, FreeShippingStrategy, QuoteContext, ShippingStrategy, StrategyRegistry,
    TableRateStrategy,
};
