//! Authentication extractor.
//!
//! Login itself happens elsewhere; this only reads the user the session
//! already carries. A request without one is a guest.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that optionally gets the current user.
///
/// `None` means the requester is a guest.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(auth: OptionalAuth) -> impl IntoResponse {
///     if auth.is_guest() { "Hello, guest!" } else { "Welcome back!" }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentUser>);

impl OptionalAuth {
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        self.0.is_none()
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        if let Some(user) = &user {
            sentry::configure_scope(|scope| {
                scope.set_user(Some(sentry::User {
                    id: Some(user.id.to_string()),
                    ..Default::default()
                }));
            });
        }

        Ok(Self(user))
    }
}
