//! Seed the storefront database with shipping configuration.
//!
//! The YAML file is parsed and validated before any connection is opened;
//! an invalid file never touches the database.

use std::path::Path;

use tracing::{error, info};

use shipquote_core::WebsiteId;
use shipquote_storefront::db;
use shipquote_storefront::seed::{ShippingConfigFile, seed_from_config, validate_config};

/// Seed shipping methods from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML configuration file
/// * `website` - Owning website, or `None` to read `STOREFRONT_WEBSITE_ID`
/// * `replace` - If true, delete the website's existing methods first
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot be
/// read or fails validation, or database operations fail.
pub async fn shipping(
    file_path: &Path,
    website: Option<i32>,
    replace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;
    let website = resolve_website(website)?;

    info!(path = %file_path.display(), "Loading shipping configuration");
    let config = ShippingConfigFile::from_file(file_path).await?;
    info!(methods = config.methods.len(), "Parsed configuration");

    let errors = validate_config(&config);
    if !errors.is_empty() {
        error!("Configuration validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let result = seed_from_config(&pool, &config, website, replace).await?;

    info!("Seeding complete!");
    info!("  Website: {website}");
    if replace {
        info!("  Methods removed: {}", result.removed);
    }
    info!("  Methods inserted: {}", result.methods);
    info!("  Table lines inserted: {}", result.lines);

    Ok(())
}

fn resolve_website(website: Option<i32>) -> Result<WebsiteId, Box<dyn std::error::Error>> {
    if let Some(id) = website {
        return Ok(WebsiteId::new(id));
    }
    let value = std::env::var("STOREFRONT_WEBSITE_ID")
        .map_err(|_| "pass --website or set STOREFRONT_WEBSITE_ID")?;
    Ok(value.parse::<WebsiteId>()?)
}
