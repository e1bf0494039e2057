//! CLI command implementations.

pub mod migrate;
pub mod quote;
pub mod seed;

/// Database URL from `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub(crate) fn database_url() -> Result<secrecy::SecretString, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(secrecy::SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL not set".into())
}
