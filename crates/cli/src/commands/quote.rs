//! Offline quoting against a shipping configuration file.
//!
//! Runs the same engine as the storefront, but over methods read from YAML
//! instead of the database. Output is the boundary JSON shape:
//!
//! ```json
//! {"result": [[1, "Standard", 10.0], [3, "Regional", 5.0]]}
//! ```
//!
//! Method ids are positions in the file, starting at 1.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use shipquote_core::{
    CountryId, Destination, RateAggregator, ShippingRequest, SubdivisionId, WebsiteId,
};
use shipquote_storefront::seed::{ShippingConfigFile, validate_config};

/// Arguments for `shipquote quote`.
#[derive(Debug, clap::Args)]
pub struct QuoteArgs {
    /// Path to the YAML configuration file
    pub file: PathBuf,

    /// Website the request comes from
    #[arg(short, long)]
    pub website: i32,

    /// Destination country id
    #[arg(short, long)]
    pub country: i32,

    /// Destination subdivision id
    #[arg(short, long)]
    pub subdivision: Option<i32>,

    /// Destination postal code
    #[arg(short, long)]
    pub zip: Option<String>,

    /// Order total the quotes are priced against
    #[arg(short, long, value_parser = parse_amount)]
    pub total: Decimal,

    /// Quote as a guest (not logged in)
    #[arg(long)]
    pub guest: bool,
}

impl QuoteArgs {
    fn request(&self) -> ShippingRequest {
        let mut destination = Destination::new(CountryId::new(self.country));
        if let Some(subdivision) = self.subdivision {
            destination = destination.with_subdivision(SubdivisionId::new(subdivision));
        }
        if let Some(zip) = &self.zip {
            destination = destination.with_postal_code(zip.as_str());
        }

        let request = ShippingRequest::new(destination, WebsiteId::new(self.website), self.total);
        if self.guest { request.as_guest() } else { request }
    }
}

/// Parse a money amount such as `120.50`.
fn parse_amount(value: &str) -> Result<Decimal, String> {
    value
        .parse::<Decimal>()
        .map_err(|e| format!("invalid amount '{value}': {e}"))
}

/// Evaluate the file for the given destination and print the result.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub async fn run(args: &QuoteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ShippingConfigFile::from_file(&args.file).await?;

    let errors = validate_config(&config);
    if !errors.is_empty() {
        return Err(format!("invalid configuration:\n  {}", errors.join("\n  ")).into());
    }

    let request = args.request();
    let (methods, lines) = config.to_engine(request.website);
    let quotes = RateAggregator::default().aggregate(&request, &methods, &lines);
    info!(methods = methods.len(), quotes = quotes.len(), "Quoted");

    let rows: Vec<_> = quotes.iter().map(|q| q.to_row()).collect();
    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&json!({ "result": rows }))?);
    }

    Ok(())
}
