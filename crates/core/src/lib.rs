//! Shipquote Core - Shipping rate-resolution engine.
//!
//! This crate computes shipping quotes for a cart given a destination address:
//! - `storefront` - HTTP service exposing quotes and shipping selection
//! - `cli` - Operator tools for migrations, seeding and offline quoting
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure evaluation logic - no
//! database access, no HTTP. Callers load method configuration and table lines
//! from their record store and hand them to [`shipping::RateAggregator`].
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and persisted enums
//! - [`shipping`] - Strategies, table matcher, aggregation and selection

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod shipping;
pub mod types;

pub use shipping::{
    Destination, FlatRate, FreeShipping, LineIndex, Pricing, QuoteRow, QuoteSet, RateAggregator,
    RateQuote, SelectionError, ShippingError, ShippingLine, ShippingMethod, ShippingRequest,
    ShippingTable, StrategyRegistry, TableLine, TableLineSource, select_quote,
};
pub use types::*;
