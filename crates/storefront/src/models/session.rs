//! Session-related types.
//!
//! Types stored in the session for authentication and checkout state.

use serde::{Deserialize, Serialize};

use shipquote_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user. A
/// session without one belongs to a guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: String,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the id of the session's open order.
    pub const ORDER_ID: &str = "order_id";

    /// Key for the last computed shipping quote set.
    pub const SHIPPING_QUOTE: &str = "shipping_quote";
}
