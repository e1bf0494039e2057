//! Access to shipping table rule lines.
//!
//! Lines for every eligible table are loaded in one batched read and indexed
//! here, so evaluating N table methods costs one store round-trip instead of N.
//! A table whose rows could not be loaded is remembered as unavailable and
//! only that method drops out of the quote listing.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rust_decimal::Decimal;

use super::error::ShippingError;
use super::method::TableLine;
use crate::types::{CountryId, ShippingMethodId, SubdivisionId, TableLineId};

/// Source of rule lines for table-priced methods.
pub trait TableLineSource: Send + Sync {
    /// All lines of `table`, in the store's default order.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::LinesUnavailable` if the table's lines could
    /// not be read.
    fn lines_for(&self, table: ShippingMethodId) -> Result<&[TableLine], ShippingError>;
}

/// In-memory index of table lines keyed by owning method.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    lines: HashMap<ShippingMethodId, Vec<TableLine>>,
    unavailable: HashMap<ShippingMethodId, String>,
}

impl LineIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index lines, keeping their relative order per table.
    pub fn from_lines(lines: impl IntoIterator<Item = TableLine>) -> Self {
        let mut index = Self::new();
        for line in lines {
            index.insert(line);
        }
        index
    }

    pub fn insert(&mut self, line: TableLine) {
        self.lines.entry(line.table).or_default().push(line);
    }

    /// Record that `table`'s lines failed to load.
    ///
    /// Any lines already indexed for the table are discarded so a partial
    /// table is never used for pricing.
    pub fn mark_unavailable(&mut self, table: ShippingMethodId, reason: impl Into<String>) {
        self.lines.remove(&table);
        self.unavailable.insert(table, reason.into());
    }

    /// Number of tables with at least one line.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_unavailable(&self, table: ShippingMethodId) -> bool {
        self.unavailable.contains_key(&table)
    }
}

impl TableLineSource for LineIndex {
    fn lines_for(&self, table: ShippingMethodId) -> Result<&[TableLine], ShippingError> {
        if let Some(reason) = self.unavailable.get(&table) {
            return Err(ShippingError::LinesUnavailable {
                table,
                reason: reason.clone(),
            });
        }
        Ok(self.lines.get(&table).map(Vec::as_slice).unwrap_or_default())
    }
}

/// Two lines of one table sharing `(country, subdivision, postal_code, threshold)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateLine {
    pub table: ShippingMethodId,
    pub first: TableLineId,
    pub second: TableLineId,
}

impl std::fmt::Display for DuplicateLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "table {}: lines {} and {} share country, subdivision, postal code and threshold",
            self.table, self.first, self.second
        )
    }
}

type LineKey = (
    ShippingMethodId,
    Option<CountryId>,
    Option<SubdivisionId>,
    Option<String>,
    Decimal,
);

/// Find lines violating the per-table uniqueness constraint.
///
/// Write paths call this before inserting; readers assume consistent data.
#[must_use]
pub fn find_duplicate_lines(lines: &[TableLine]) -> Vec<DuplicateLine> {
    let mut seen: HashMap<LineKey, TableLineId> = HashMap::new();
    let mut duplicates = Vec::new();

    for line in lines {
        // Decimal equality ignores scale, so 10 and 10.00 collide.
        let key = (
            line.table,
            line.country,
            line.subdivision,
            line.postal_code().map(str::to_owned),
            line.threshold.normalize(),
        );
        match seen.entry(key) {
            Entry::Occupied(first) => duplicates.push(DuplicateLine {
                table: line.table,
                first: *first.get(),
                second: line.id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(line.id);
            }
        }
    }

    duplicates
}
