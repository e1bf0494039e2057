//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (database ping)
//!
//! # Shipping (JSON, rate limited)
//! GET  /shipping/available_methods   - Quote every method for a destination
//! POST /checkout/shipping            - Confirm a quoted method on the open order
//! ```

pub mod health;
pub mod shipping;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the health check routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Create the shipping routes router.
pub fn shipping_routes() -> Router<AppState> {
    Router::new()
        .route("/shipping/available_methods", get(shipping::available_methods))
        .route("/checkout/shipping", post(shipping::select_shipping))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(shipping_routes())
}
