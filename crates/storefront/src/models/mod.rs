//! Domain models for storefront.

pub mod address;
pub mod order;
pub mod session;

pub use address::Address;
pub use order::{Order, OrderState};
pub use session::{CurrentUser, keys as session_keys};
