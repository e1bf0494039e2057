//! Business logic services for storefront.
//!
//! # Services
//!
//! - `shipping` - Load method configuration (cached) and compute quotes
//! - `quote_session` - Keep the last quote set in the session for selection

pub mod quote_session;
pub mod shipping;
