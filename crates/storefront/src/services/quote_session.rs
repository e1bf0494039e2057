//! Session storage for the last computed quote set.
//!
//! The listing endpoint stores what it showed; the confirmation endpoint
//! only accepts a method from that set, at the price it was shown.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use shipquote_core::{Destination, QuoteSet};

use crate::models::session_keys;

/// Store `set`, replacing any previous quote set.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn store(session: &Session, set: &QuoteSet) -> Result<(), SessionError> {
    session.insert(session_keys::SHIPPING_QUOTE, set).await
}

/// The stored quote set, if present and still valid for an order shipping
/// to `destination` with `order_total`.
///
/// A value that no longer deserializes is treated as absent.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn load_valid(
    session: &Session,
    destination: &Destination,
    order_total: Decimal,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<Option<QuoteSet>, SessionError> {
    let set = match session.get::<QuoteSet>(session_keys::SHIPPING_QUOTE).await {
        Ok(set) => set,
        Err(SessionError::SerdeJson(e)) => {
            tracing::warn!(error = %e, "Discarding unreadable shipping quote from session");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(set.filter(|set| is_valid(set, destination, order_total, now, ttl)))
}

/// Whether `set` may still be used for confirmation.
#[must_use]
pub fn is_valid(
    set: &QuoteSet,
    destination: &Destination,
    order_total: Decimal,
    now: DateTime<Utc>,
    ttl: Duration,
) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => set.is_valid_for(destination, order_total, now, ttl),
        // Out of chrono's range: effectively no expiry.
        Err(_) => set.destination.same_zone(destination) && set.order_total == order_total,
    }
}
