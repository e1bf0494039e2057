//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session
//! carries the logged-in user, the open order and the last quote set. The
//! cookie is signed with `STOREFRONT_SESSION_SECRET`, so a tampered session
//! id is rejected before the store is consulted.

use sqlx::PgPool;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::{ConfigError, StorefrontConfig};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sq_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The store's table is created by `shipquote migrate`.
///
/// # Errors
///
/// Returns `ConfigError` if the session secret cannot form a signing key.
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, ConfigError> {
    signed_session_layer(PostgresStore::new(pool.clone()), config)
}

/// Session layer over any store, with the storefront's cookie settings.
///
/// # Errors
///
/// Returns `ConfigError` if the session secret cannot form a signing key.
pub fn signed_session_layer<S: SessionStore>(
    store: S,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<S, SignedCookie>, ConfigError> {
    let key = config.session_key()?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use axum::routing::get;
    use secrecy::SecretString;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, Session};

    use super::*;
    use crate::config::ShippingSettings;

    /// Length of the base64 MAC prepended to a signed cookie value.
    const SIGNATURE_LEN: usize = 44;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/shipquote".to_string()),
            host: [127, 0, 0, 1].into(),
            port: 3000,
            base_url: url::Url::parse("http://localhost:3000").unwrap(),
            session_secret: SecretString::from(
                "k3Jx9QmZ2vLp8RtY4wNb7HcF5sDg1AeUr6Tn0WqE2yHs8KdV4mXc7BfJ1pLz9GaN".to_string(),
            ),
            website: shipquote_core::WebsiteId::new(1),
            shipping: ShippingSettings {
                quote_ttl: Duration::from_secs(900),
                config_cache_ttl: None,
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    async fn visit(session: Session) -> String {
        let visits = session.get::<u32>("visits").await.unwrap().unwrap_or(0) + 1;
        session.insert("visits", visits).await.unwrap();
        visits.to_string()
    }

    async fn send(app: &Router, cookie: Option<&str>) -> (Option<String>, String) {
        let mut request = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (set_cookie, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_signed_cookie_round_trip() {
        let layer = signed_session_layer(MemoryStore::default(), &config()).unwrap();
        let app = Router::new().route("/", get(visit)).layer(layer);

        let (cookie, body) = send(&app, None).await;
        let cookie = cookie.unwrap();
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE_NAME}=")));
        assert_eq!(body, "1");

        let (_, body) = send(&app, Some(&cookie)).await;
        assert_eq!(body, "2");
    }

    #[tokio::test]
    async fn test_unsigned_session_id_starts_fresh() {
        let layer = signed_session_layer(MemoryStore::default(), &config()).unwrap();
        let app = Router::new().route("/", get(visit)).layer(layer);

        let (cookie, _) = send(&app, None).await;
        let cookie = cookie.unwrap();
        let value = cookie.split_once('=').unwrap().1;
        let bare_id = value.get(SIGNATURE_LEN..).unwrap();

        let forged = format!("{SESSION_COOKIE_NAME}={bare_id}");
        let (_, body) = send(&app, Some(&forged)).await;
        assert_eq!(body, "1");
    }

    #[test]
    fn test_short_secret_has_no_layer() {
        let mut config = config();
        config.session_secret = SecretString::from("aB3$xY9!mK2@nL5#".to_string());
        assert!(signed_session_layer(MemoryStore::default(), &config).is_err());
    }
}
