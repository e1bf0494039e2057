//! YAML shipping configuration: parsing, validation and offline quoting.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use shipquote_core::{
    CountryId, Destination, MethodKind, RateAggregator, ShippingRequest, SubdivisionId,
};
use shipquote_integration_tests::TEST_WEBSITE;
use shipquote_storefront::seed::{SeedError, ShippingConfigFile, validate_config};

const STORE_CONFIG: &str = r#"
methods:
  - name: Standard
    kind: flat
    price: "4.99"
    countries: [10, 11]

  - name: Free over 100
    kind: free
    minimum_order_value: 100
    countries: [10]
    allow_guests: false

  - name: Retired
    kind: flat
    price: 1
    countries: [10]
    active: false

  - name: Regional
    kind: table
    factor: total_price
    countries: [10]
    lines:
      - { country: 10, subdivision: 20, zip: "Z", threshold: 250, price: 25 }
      - { country: 10, subdivision: 20, threshold: 0, price: 9 }
      - { country: 10, threshold: 0, price: 5 }
      - { threshold: 0, price: 15 }
"#;

fn quote(dest: Destination, total: i64, guest: bool) -> Vec<(String, Decimal)> {
    let config = ShippingConfigFile::from_yaml(STORE_CONFIG).unwrap();
    let (methods, lines) = config.to_engine(TEST_WEBSITE);
    let mut request = ShippingRequest::new(dest, TEST_WEBSITE, Decimal::new(total, 0));
    if guest {
        request = request.as_guest();
    }
    RateAggregator::default()
        .aggregate(&request, &methods, &lines)
        .into_iter()
        .map(|q| (q.name, q.amount))
        .collect()
}

#[test]
fn test_store_config_is_valid() {
    let config = ShippingConfigFile::from_yaml(STORE_CONFIG).unwrap();
    assert!(validate_config(&config).is_empty());

    let (methods, _) = config.to_engine(TEST_WEBSITE);
    let kinds: Vec<_> = methods.iter().map(|m| m.kind()).collect();
    assert_eq!(
        kinds,
        vec![MethodKind::Flat, MethodKind::Flat, MethodKind::Free, MethodKind::Table]
    );
    assert_eq!(methods[1].name, "Retired");
    assert!(!methods[1].active);
}

#[test]
fn test_member_quotes_by_kind() {
    let dest = Destination::new(CountryId::new(10)).with_subdivision(SubdivisionId::new(20));
    assert_eq!(
        quote(dest, 120, false),
        vec![
            ("Standard".to_string(), Decimal::new(499, 2)),
            ("Free over 100".to_string(), Decimal::ZERO),
            ("Regional".to_string(), Decimal::new(9, 0)),
        ]
    );
}

#[test]
fn test_guest_loses_member_only_method() {
    let dest = Destination::new(CountryId::new(10)).with_postal_code("Z");
    let names: Vec<_> = quote(dest, 120, true).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["Standard", "Regional"]);
}

#[test]
fn test_second_country_only_has_flat() {
    let dest = Destination::new(CountryId::new(11));
    assert_eq!(
        quote(dest, 500, false),
        vec![("Standard".to_string(), Decimal::new(499, 2))]
    );
}

#[test]
fn test_missing_price_is_a_parse_error() {
    let yaml = "methods:\n  - name: Broken\n    kind: flat\n    countries: [1]\n";
    assert!(matches!(
        ShippingConfigFile::from_yaml(yaml),
        Err(SeedError::Parse(_))
    ));
}

#[test]
fn test_negative_line_values_are_reported() {
    let yaml = r"
methods:
  - name: Regional
    kind: table
    countries: [10]
    lines:
      - { threshold: -1, price: -2 }
";
    let config = ShippingConfigFile::from_yaml(yaml).unwrap();
    let errors = validate_config(&config);
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors[0].contains("threshold must not be negative"));
    assert!(errors[1].contains("price must not be negative"));
}

#[test]
fn test_blank_zip_duplicates_wildcard_line() {
    let yaml = r#"
methods:
  - name: Regional
    kind: table
    countries: [10]
    lines:
      - { country: 10, threshold: 0, price: 5 }
      - { country: 10, zip: "  ", threshold: 0, price: 6 }
"#;
    let config = ShippingConfigFile::from_yaml(yaml).unwrap();
    let errors = validate_config(&config);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].starts_with("duplicate table line"));
}

#[test]
fn test_countryless_subdivision_line_is_rejected() {
    let yaml = r"
methods:
  - name: Regional
    kind: table
    countries: [10]
    lines:
      - { subdivision: 20, threshold: 0, price: 5 }
";
    let config = ShippingConfigFile::from_yaml(yaml).unwrap();
    let errors = validate_config(&config);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("require a country"));
}

#[test]
fn test_empty_file_is_invalid() {
    let config = ShippingConfigFile::from_yaml("methods: []").unwrap();
    assert_eq!(validate_config(&config), vec!["no shipping methods defined"]);
}
