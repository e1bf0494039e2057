//! Persisted enums describing shipping configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stored text did not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The offending text.
    pub value: String,
}

/// The pricing strategy a shipping method uses.
///
/// Each kind maps to one evaluator in the
/// [`StrategyRegistry`](crate::shipping::StrategyRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Always the configured price.
    Flat,
    /// Zero once the order total reaches a minimum.
    Free,
    /// Zone and tier lookup in a rule table.
    Table,
}

impl MethodKind {
    /// All built-in kinds, in registration order.
    pub const ALL: [Self; 3] = [Self::Flat, Self::Free, Self::Table];

    /// Stable text form used in storage and configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Free => "free",
            Self::Table => "table",
        }
    }
}

impl std::fmt::Display for MethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MethodKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "free" => Ok(Self::Free),
            "table" => Ok(Self::Table),
            _ => Err(UnknownVariant {
                kind: "method kind",
                value: s.to_owned(),
            }),
        }
    }
}

/// The order quantity a shipping table's thresholds are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TableFactor {
    /// The order's monetary total.
    #[default]
    TotalPrice,
}

impl TableFactor {
    /// Stable text form used in storage and configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TotalPrice => "total_price",
        }
    }
}

impl std::fmt::Display for TableFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TableFactor {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total_price" => Ok(Self::TotalPrice),
            _ => Err(UnknownVariant {
                kind: "table factor",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_method_kind_text_round_trip() {
        for kind in MethodKind::ALL {
            assert_eq!(kind.as_str().parse::<MethodKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_method_kind_rejects_unknown() {
        let err = "ups".parse::<MethodKind>().unwrap_err();
        assert_eq!(err.to_string(), "invalid method kind: ups");
    }

    #[test]
    fn test_table_factor_serde() {
        let json = serde_json::to_string(&TableFactor::TotalPrice).unwrap();
        assert_eq!(json, "\"total_price\"");
        assert!("total_weight".parse::<TableFactor>().is_err());
    }
}
