//! Load shipping method configuration from YAML.
//!
//! The same file can be written into the database for a website, or turned
//! into engine types directly for offline quoting.
//!
//! ## YAML Format
//!
//! ```yaml
//! methods:
//!   - name: Standard
//!     kind: flat
//!     price: "10.00"
//!     countries: [1, 2]
//!
//!   - name: Free over 150
//!     kind: free
//!     minimum_order_value: 150
//!     countries: [1]
//!     allow_guests: false
//!
//!   - name: Regional
//!     kind: table
//!     countries: [1]
//!     lines:
//!       - { country: 1, subdivision: 5, zip: "560001", threshold: 0, price: 5 }
//!       - { country: 1, threshold: 0, price: 8 }
//!       - { threshold: 0, price: 12 }
//! ```
//!
//! `active` and `allow_guests` default to true; `factor` defaults to
//! `total_price`.

use std::collections::BTreeSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use shipquote_core::shipping::find_duplicate_lines;
use shipquote_core::shipping::request::normalize_postal_code;
use shipquote_core::{
    CountryId, FlatRate, FreeShipping, LineIndex, Pricing, ShippingMethod, ShippingMethodId,
    ShippingTable, SubdivisionId, TableFactor, TableLine, TableLineId, WebsiteId,
};

use crate::db::RepositoryError;
use crate::db::shipping::{self, NewShippingMethod, NewTableLine};

/// Errors from loading or seeding a shipping configuration.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid shipping configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Database(#[from] RepositoryError),
}

/// Full configuration file structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShippingConfigFile {
    pub methods: Vec<MethodConfig>,
}

/// One shipping method.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub allow_guests: bool,
    #[serde(default)]
    pub countries: Vec<CountryId>,
    #[serde(flatten)]
    pub pricing: PricingConfig,
}

/// Strategy-specific settings, selected by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingConfig {
    Flat {
        price: Decimal,
    },
    Free {
        minimum_order_value: Decimal,
    },
    Table {
        #[serde(default)]
        factor: TableFactor,
        #[serde(default)]
        lines: Vec<LineConfig>,
    },
}

/// One rule of a table method. Omitted fields are wildcards.
#[derive(Debug, Clone, Deserialize)]
pub struct LineConfig {
    pub country: Option<CountryId>,
    pub subdivision: Option<SubdivisionId>,
    pub zip: Option<String>,
    pub threshold: Decimal,
    pub price: Decimal,
}

const fn default_true() -> bool {
    true
}

impl PricingConfig {
    const fn to_pricing(&self) -> Pricing {
        match self {
            Self::Flat { price } => Pricing::Flat(FlatRate { price: *price }),
            Self::Free {
                minimum_order_value,
            } => Pricing::Free(FreeShipping {
                minimum_order_value: *minimum_order_value,
            }),
            Self::Table { factor, .. } => Pricing::Table(ShippingTable { factor: *factor }),
        }
    }

    fn lines(&self) -> &[LineConfig] {
        match self {
            Self::Table { lines, .. } => lines,
            Self::Flat { .. } | Self::Free { .. } => &[],
        }
    }
}

impl LineConfig {
    fn to_line(&self, id: TableLineId, table: ShippingMethodId) -> TableLine {
        let mut line = TableLine::new(id, table, self.threshold, self.price);
        if let Some(country) = self.country {
            line = line.for_country(country);
        }
        if let Some(subdivision) = self.subdivision {
            line = line.for_subdivision(subdivision);
        }
        if let Some(zip) = &self.zip {
            line = line.for_postal_code(zip.as_str());
        }
        line
    }

    fn to_new_line(&self) -> NewTableLine {
        NewTableLine {
            country: self.country,
            subdivision: self.subdivision,
            postal_code: normalize_postal_code(self.zip.clone()),
            threshold: self.threshold,
            price: self.price,
        }
    }
}

impl ShippingConfigFile {
    /// Parse a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` if the text is not a valid configuration.
    pub fn from_yaml(content: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Io` if the file cannot be read, or
    /// `SeedError::Parse` if it is not a valid configuration.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml(&content)
    }

    /// Engine types for `website`, with ids assigned in file order from 1.
    ///
    /// Methods come back ordered by kind then id, the order the storefront
    /// lists seeded methods in.
    #[must_use]
    pub fn to_engine(&self, website: WebsiteId) -> (Vec<ShippingMethod>, LineIndex) {
        let mut methods: Vec<ShippingMethod> = (1..)
            .zip(&self.methods)
            .map(|(id, config)| {
                let mut method = ShippingMethod::new(
                    ShippingMethodId::new(id),
                    &config.name,
                    website,
                    config.pricing.to_pricing(),
                )
                .with_countries(config.countries.iter().copied());
                method.active = config.active;
                method.is_allowed_for_guest = config.allow_guests;
                method
            })
            .collect();
        methods.sort_by_key(|m| (m.kind(), m.id));

        (methods, LineIndex::from_lines(self.table_lines()))
    }

    /// Every table line in the file, numbered the same way as `to_engine`.
    fn table_lines(&self) -> Vec<TableLine> {
        (1..)
            .zip(&self.methods)
            .flat_map(|(table, method)| {
                method
                    .pricing
                    .lines()
                    .iter()
                    .map(move |line| (ShippingMethodId::new(table), line))
            })
            .zip(1..)
            .map(|((table, line), id)| line.to_line(TableLineId::new(id), table))
            .collect()
    }
}

/// Validate a configuration, returning one message per problem.
#[must_use]
pub fn validate_config(config: &ShippingConfigFile) -> Vec<String> {
    let mut errors = Vec::new();

    if config.methods.is_empty() {
        errors.push("no shipping methods defined".to_string());
    }

    for (index, method) in config.methods.iter().enumerate() {
        let label = format!("method #{} ({})", index + 1, method.name);

        if method.name.trim().is_empty() {
            errors.push(format!("method #{}: name is empty", index + 1));
        }
        if method.countries.is_empty() {
            errors.push(format!("{label}: at least one country is required"));
        }

        match &method.pricing {
            PricingConfig::Flat { price } if price.is_sign_negative() => {
                errors.push(format!("{label}: price must not be negative"));
            }
            PricingConfig::Free {
                minimum_order_value,
            } if minimum_order_value.is_sign_negative() => {
                errors.push(format!("{label}: minimum_order_value must not be negative"));
            }
            PricingConfig::Table { lines, .. } => {
                for (line_no, line) in lines.iter().enumerate() {
                    let has_zip = line.zip.as_deref().is_some_and(|z| !z.trim().is_empty());
                    if line.country.is_none() && (line.subdivision.is_some() || has_zip) {
                        errors.push(format!(
                            "{label}: line #{}: subdivision and zip require a country",
                            line_no + 1
                        ));
                    }
                    if line.threshold.is_sign_negative() {
                        errors.push(format!(
                            "{label}: line #{}: threshold must not be negative",
                            line_no + 1
                        ));
                    }
                    if line.price.is_sign_negative() {
                        errors.push(format!(
                            "{label}: line #{}: price must not be negative",
                            line_no + 1
                        ));
                    }
                }
            }
            PricingConfig::Flat { .. } | PricingConfig::Free { .. } => {}
        }
    }

    for duplicate in find_duplicate_lines(&config.table_lines()) {
        errors.push(format!("duplicate table line: {duplicate}"));
    }

    errors
}

/// Result of a seeding operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    /// Methods removed first (replace mode only).
    pub removed: u64,
    /// Methods inserted.
    pub methods: usize,
    /// Table lines inserted.
    pub lines: usize,
}

/// Seed shipping methods from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or if database operations fail.
#[instrument(skip(pool, path), fields(path = %path.as_ref().display()))]
pub async fn seed_from_file<P: AsRef<Path>>(
    pool: &PgPool,
    path: P,
    website: WebsiteId,
    replace: bool,
) -> Result<SeedResult, SeedError> {
    let config = ShippingConfigFile::from_file(path).await?;
    seed_from_config(pool, &config, website, replace).await
}

/// Seed shipping methods from a configuration struct.
///
/// Everything is written in one transaction: either the whole file lands or
/// nothing does. With `replace`, the website's existing methods are deleted
/// first.
///
/// # Errors
///
/// Returns `SeedError::Invalid` if validation fails, or
/// `SeedError::Database` if any statement fails.
#[instrument(skip(pool, config), fields(methods = config.methods.len(), website = %website))]
pub async fn seed_from_config(
    pool: &PgPool,
    config: &ShippingConfigFile,
    website: WebsiteId,
    replace: bool,
) -> Result<SeedResult, SeedError> {
    let errors = validate_config(config);
    if !errors.is_empty() {
        return Err(SeedError::Invalid(errors));
    }

    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;
    let mut result = SeedResult::default();

    if replace {
        result.removed = shipping::delete_website_methods(&mut *tx, website).await?;
        info!(removed = result.removed, "Cleared existing shipping methods");
    }

    for method in &config.methods {
        let new_method = NewShippingMethod {
            name: method.name.clone(),
            active: method.active,
            is_allowed_for_guest: method.allow_guests,
            website,
            pricing: method.pricing.to_pricing(),
            countries: method.countries.iter().copied().collect::<BTreeSet<_>>(),
        };
        let id = shipping::insert_method(&mut *tx, &new_method).await?;
        result.methods += 1;

        for line in method.pricing.lines() {
            shipping::insert_table_line(&mut *tx, id, &line.to_new_line()).await?;
            result.lines += 1;
        }
    }

    tx.commit().await.map_err(RepositoryError::from)?;

    info!(
        methods = result.methods,
        lines = result.lines,
        "Seeding complete"
    );

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shipquote_core::{Destination, MethodKind, RateAggregator, ShippingRequest};

    const SAMPLE: &str = r#"
methods:
  - name: Standard
    kind: flat
    price: "10.00"
    countries: [1]
  - name: Free over 150
    kind: free
    minimum_order_value: 150
    countries: [1]
    allow_guests: false
  - name: Regional
    kind: table
    countries: [1]
    lines:
      - { country: 1, subdivision: 5, threshold: 0, price: 5 }
      - { threshold: 0, price: 12 }
"#;

    #[test]
    fn test_parse_sample() {
        let config = ShippingConfigFile::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.methods.len(), 3);
        assert!(config.methods[0].active);
        assert!(!config.methods[1].allow_guests);
        let PricingConfig::Table { factor, lines } = &config.methods[2].pricing else {
            panic!("expected table pricing");
        };
        assert_eq!(*factor, TableFactor::TotalPrice);
        assert_eq!(lines.len(), 2);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_unknown_kind_fails_to_parse() {
        let yaml = "methods:\n  - name: X\n    kind: carrier\n    countries: [1]\n";
        assert!(matches!(
            ShippingConfigFile::from_yaml(yaml),
            Err(SeedError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_reports_each_problem() {
        let yaml = r#"
methods:
  - name: Broken
    kind: flat
    price: "-1"
  - name: Dupes
    kind: table
    countries: [1]
    lines:
      - { country: 1, threshold: 10, price: 5 }
      - { country: 1, threshold: "10.00", price: 7 }
"#;
        let config = ShippingConfigFile::from_yaml(yaml).unwrap();
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].contains("at least one country"));
        assert!(errors[1].contains("price must not be negative"));
        assert!(errors[2].starts_with("duplicate table line"));
    }

    #[test]
    fn test_line_without_country_cannot_narrow() {
        let yaml = r#"
methods:
  - name: Regional
    kind: table
    countries: [1]
    lines:
      - { subdivision: 5, threshold: 0, price: 5 }
      - { zip: "560001", threshold: 0, price: 6 }
      - { zip: " ", threshold: 0, price: 7 }
"#;
        let config = ShippingConfigFile::from_yaml(yaml).unwrap();
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors[0].contains("line #1: subdivision and zip require a country"));
        assert!(errors[1].contains("line #2: subdivision and zip require a country"));
    }

    #[test]
    fn test_same_line_in_different_tables_is_fine() {
        let yaml = r"
methods:
  - name: A
    kind: table
    countries: [1]
    lines: [{ threshold: 0, price: 5 }]
  - name: B
    kind: table
    countries: [1]
    lines: [{ threshold: 0, price: 5 }]
";
        let config = ShippingConfigFile::from_yaml(yaml).unwrap();
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_to_engine_orders_by_kind_then_id() {
        let yaml = r#"
methods:
  - name: Zones
    kind: table
    countries: [1]
    lines: [{ threshold: 0, price: 5 }]
  - name: Free
    kind: free
    minimum_order_value: 0
    countries: [1]
  - name: Express
    kind: flat
    price: "20"
    countries: [1]
  - name: Standard
    kind: flat
    price: "10"
    countries: [1]
"#;
        let config = ShippingConfigFile::from_yaml(yaml).unwrap();
        let (methods, lines) = config.to_engine(WebsiteId::new(1));
        let order: Vec<_> = methods.iter().map(|m| (m.id.as_i32(), m.name.as_str())).collect();
        assert_eq!(
            order,
            vec![(3, "Express"), (4, "Standard"), (2, "Free"), (1, "Zones")]
        );

        // Table lines stay attached to the table's file-order id.
        let request = ShippingRequest::new(
            Destination::new(CountryId::new(1)),
            WebsiteId::new(1),
            Decimal::ZERO,
        );
        let quotes = RateAggregator::default().aggregate(&request, &methods, &lines);
        assert_eq!(quotes.last().unwrap().amount, Decimal::new(5, 0));
    }

    #[test]
    fn test_to_engine_quotes_offline() {
        let config = ShippingConfigFile::from_yaml(SAMPLE).unwrap();
        let website = WebsiteId::new(1);
        let (methods, lines) = config.to_engine(website);
        assert_eq!(methods[2].id, ShippingMethodId::new(3));
        assert_eq!(methods[2].kind(), MethodKind::Table);

        let dest = Destination::new(CountryId::new(1)).with_subdivision(SubdivisionId::new(5));
        let request = ShippingRequest::new(dest, website, Decimal::new(200, 0));
        let quotes = RateAggregator::default().aggregate(&request, &methods, &lines);

        let amounts: Vec<_> = quotes.iter().map(|q| (q.name.as_str(), q.amount)).collect();
        assert_eq!(
            amounts,
            vec![
                ("Standard", Decimal::new(10, 0)),
                ("Free over 150", Decimal::ZERO),
                ("Regional", Decimal::new(5, 0)),
            ]
        );
    }
}
