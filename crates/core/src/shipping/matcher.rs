//! Specificity-ranked table matching.
//!
//! Rules are authored at four specificity levels. The matcher tries the most
//! specific level first and relaxes one field at a time, country last:
//!
//! ```text
//! PostalCode   country = C   subdivision = S   postal_code = Z
//! Subdivision  country = C   subdivision = S   postal_code = *
//! Country      country = C   subdivision = *   postal_code = *
//! Default      country = *   subdivision = *   postal_code = *
//! ```
//!
//! `*` means the line must leave that field unset, not "anything goes". The
//! first level with at least one line wins outright, so a more specific rule
//! always beats a looser one and levels are never mixed. Inside the winning
//! level the tier with the greatest threshold not above the comparison value
//! is chosen. If the comparison value is below every tier of the winning
//! level, there is no match at all.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::method::TableLine;
use super::request::Destination;
use crate::types::{CountryId, SubdivisionId};

/// How many destination fields a group of lines constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    PostalCode,
    Subdivision,
    Country,
    Default,
}

impl Specificity {
    /// Evaluation order, most specific first.
    pub const CASCADE: [Self; 4] = [
        Self::PostalCode,
        Self::Subdivision,
        Self::Country,
        Self::Default,
    ];
}

/// Required values for one specificity level; `None` means "must be unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineFilter<'a> {
    country: Option<CountryId>,
    subdivision: Option<SubdivisionId>,
    postal_code: Option<&'a str>,
}

impl<'a> LineFilter<'a> {
    fn for_level(level: Specificity, destination: &'a Destination) -> Self {
        let exact = Self {
            country: Some(destination.country),
            subdivision: destination.subdivision,
            postal_code: destination.postal_code(),
        };
        match level {
            Specificity::PostalCode => exact,
            Specificity::Subdivision => Self {
                postal_code: None,
                ..exact
            },
            Specificity::Country => Self {
                subdivision: None,
                postal_code: None,
                ..exact
            },
            Specificity::Default => Self {
                country: None,
                subdivision: None,
                postal_code: None,
            },
        }
    }

    fn matches(&self, line: &TableLine) -> bool {
        line.country == self.country
            && line.subdivision == self.subdivision
            && line.postal_code() == self.postal_code
    }
}

/// The line a table resolved to, and the level it was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMatch<'a> {
    pub line: &'a TableLine,
    pub specificity: Specificity,
}

/// Matcher over the lines of one shipping table.
#[derive(Debug, Clone, Copy)]
pub struct TableMatcher<'a> {
    lines: &'a [TableLine],
}

impl<'a> TableMatcher<'a> {
    #[must_use]
    pub const fn new(lines: &'a [TableLine]) -> Self {
        Self { lines }
    }

    /// Lines of the most specific non-empty level, or `None` if every level is
    /// empty. Lines keep their input order.
    #[must_use]
    pub fn winning_set(&self, destination: &Destination) -> Option<(Specificity, Vec<&'a TableLine>)> {
        Specificity::CASCADE.into_iter().find_map(|level| {
            let filter = LineFilter::for_level(level, destination);
            let set: Vec<&'a TableLine> =
                self.lines.iter().filter(|line| filter.matches(line)).collect();
            (!set.is_empty()).then_some((level, set))
        })
    }

    /// Resolve the destination and comparison value to a single line.
    ///
    /// Equal thresholds keep their input order (the sort is stable), so the
    /// result is deterministic for a given store ordering.
    #[must_use]
    pub fn best_match(
        &self,
        destination: &Destination,
        comparison_value: Decimal,
    ) -> Option<TableMatch<'a>> {
        let (specificity, mut set) = self.winning_set(destination)?;
        set.sort_by(|a, b| b.threshold.cmp(&a.threshold));
        set.into_iter()
            .find(|line| line.threshold <= comparison_value)
            .map(|line| TableMatch { line, specificity })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ShippingMethodId, TableLineId};

    const C: CountryId = CountryId::new(1);
    const S: SubdivisionId = SubdivisionId::new(10);
    const S2: SubdivisionId = SubdivisionId::new(11);

    fn line(id: i32, threshold: i64, price: i64) -> TableLine {
        TableLine::new(
            TableLineId::new(id),
            ShippingMethodId::new(1),
            Decimal::new(threshold, 0),
            Decimal::new(price, 0),
        )
    }

    fn dest(subdivision: SubdivisionId, zip: &str) -> Destination {
        Destination::new(C)
            .with_subdivision(subdivision)
            .with_postal_code(zip)
    }

    fn price_of(lines: &[TableLine], destination: &Destination, total: i64) -> Option<Decimal> {
        TableMatcher::new(lines)
            .best_match(destination, Decimal::new(total, 0))
            .map(|m| m.line.price)
    }

    #[test]
    fn test_exact_match_beats_country_default() {
        let lines = vec![
            line(1, 250, 25).for_country(C).for_subdivision(S).for_postal_code("Z"),
            line(2, 0, 5).for_country(C),
        ];
        let m = TableMatcher::new(&lines)
            .best_match(&dest(S, "Z"), Decimal::new(300, 0))
            .unwrap();
        assert_eq!(m.line.price, Decimal::new(25, 0));
        assert_eq!(m.specificity, Specificity::PostalCode);
    }

    #[test]
    fn test_falls_back_to_country_level() {
        let lines = vec![
            line(1, 250, 25).for_country(C).for_subdivision(S).for_postal_code("Z"),
            line(2, 0, 5).for_country(C),
        ];
        let m = TableMatcher::new(&lines)
            .best_match(&dest(S2, "Z2"), Decimal::new(10, 0))
            .unwrap();
        assert_eq!(m.line.price, Decimal::new(5, 0));
        assert_eq!(m.specificity, Specificity::Country);
    }

    #[test]
    fn test_subdivision_level_ignores_postal_code() {
        let lines = vec![
            line(1, 0, 8).for_country(C).for_subdivision(S),
            line(2, 0, 5).for_country(C),
        ];
        assert_eq!(price_of(&lines, &dest(S, "99999"), 1), Some(Decimal::new(8, 0)));
    }

    #[test]
    fn test_default_level_used_for_other_countries() {
        let lines = vec![line(1, 0, 40), line(2, 0, 5).for_country(C)];
        let abroad = Destination::new(CountryId::new(2));
        assert_eq!(price_of(&lines, &abroad, 1), Some(Decimal::new(40, 0)));
    }

    #[test]
    fn test_specific_level_wins_even_when_below_its_tiers() {
        // The exact-level set is non-empty, so the looser default is never consulted.
        let lines = vec![
            line(1, 250, 25).for_country(C).for_subdivision(S).for_postal_code("Z"),
            line(2, 0, 5).for_country(C),
        ];
        assert_eq!(price_of(&lines, &dest(S, "Z"), 100), None);
    }

    #[test]
    fn test_highest_reached_tier_wins() {
        let lines = vec![
            line(1, 0, 15).for_country(C),
            line(2, 100, 10).for_country(C),
            line(3, 500, 0).for_country(C),
        ];
        let d = Destination::new(C);
        assert_eq!(price_of(&lines, &d, 50), Some(Decimal::new(15, 0)));
        assert_eq!(price_of(&lines, &d, 100), Some(Decimal::new(10, 0)));
        assert_eq!(price_of(&lines, &d, 499), Some(Decimal::new(10, 0)));
        assert_eq!(price_of(&lines, &d, 900), Some(Decimal::ZERO));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let lines = vec![line(1, 100, 7).for_country(C)];
        let d = Destination::new(C);
        assert_eq!(price_of(&lines, &d, 100), Some(Decimal::new(7, 0)));
        assert_eq!(price_of(&lines, &d, 99), None);
    }

    #[test]
    fn test_empty_table_never_matches() {
        assert_eq!(price_of(&[], &Destination::new(C), 1000), None);
    }

    #[test]
    fn test_equal_thresholds_keep_store_order() {
        let lines = vec![line(1, 0, 3).for_country(C), line(2, 0, 4).for_country(C)];
        let m = TableMatcher::new(&lines)
            .best_match(&Destination::new(C), Decimal::ONE)
            .unwrap();
        assert_eq!(m.line.id, TableLineId::new(1));
    }

    #[test]
    fn test_request_without_postal_code_matches_subdivision_level() {
        let lines = vec![
            line(1, 0, 9).for_country(C).for_subdivision(S).for_postal_code("Z"),
            line(2, 0, 6).for_country(C).for_subdivision(S),
        ];
        let d = Destination::new(C).with_subdivision(S);
        let m = TableMatcher::new(&lines)
            .best_match(&d, Decimal::ONE)
            .unwrap();
        assert_eq!(m.line.price, Decimal::new(6, 0));
    }

    #[test]
    fn test_line_with_other_postal_code_is_not_a_wildcard() {
        let lines = vec![line(1, 0, 9).for_country(C).for_subdivision(S).for_postal_code("A")];
        assert_eq!(price_of(&lines, &dest(S, "B"), 1), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn tiers() -> impl Strategy<Value = Vec<(i64, i64)>> {
            prop::collection::btree_map(0i64..1_000, 0i64..100, 1..8)
                .prop_map(|m| m.into_iter().collect())
        }

        proptest! {
            #[test]
            fn prop_picks_greatest_reached_threshold(tiers in tiers(), total in 0i64..1_200) {
                let lines: Vec<_> = tiers
                    .iter()
                    .enumerate()
                    .map(|(i, &(t, p))| line(i32::try_from(i).unwrap(), t, p).for_country(C))
                    .collect();
                let expected = tiers
                    .iter()
                    .filter(|(t, _)| *t <= total)
                    .max_by_key(|(t, _)| *t)
                    .map(|&(_, p)| Decimal::new(p, 0));
                prop_assert_eq!(price_of(&lines, &Destination::new(C), total), expected);
            }

            #[test]
            fn prop_exact_line_always_outranks_looser(tiers in tiers(), total in 0i64..1_200) {
                let mut lines: Vec<_> = tiers
                    .iter()
                    .enumerate()
                    .map(|(i, &(t, p))| line(i32::try_from(i).unwrap(), t, p).for_country(C))
                    .collect();
                lines.push(line(99, 0, 1).for_country(C).for_subdivision(S).for_postal_code("Z"));
                let m = TableMatcher::new(&lines)
                    .best_match(&dest(S, "Z"), Decimal::new(total, 0))
                    .unwrap();
                prop_assert_eq!(m.specificity, Specificity::PostalCode);
                prop_assert_eq!(m.line.id, TableLineId::new(99));
            }
        }
    }
}
