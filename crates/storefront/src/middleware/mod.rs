//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store, signed cookie)
//! 5. Rate limiting on shipping endpoints (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::OptionalAuth;
pub use rate_limit::shipping_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, signed_session_layer};
