//! Shipping engine errors.

use thiserror::Error;

use crate::types::{MethodKind, ShippingMethodId};

/// Errors raised while evaluating a single shipping method.
///
/// These never reach the caller of [`RateAggregator`](super::RateAggregator):
/// the aggregator logs them and the failing method contributes no quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShippingError {
    /// The rule table backing a table method could not be read.
    #[error("table lines unavailable for method {table}: {reason}")]
    LinesUnavailable {
        table: ShippingMethodId,
        reason: String,
    },

    /// An evaluator was handed a method configured for another strategy.
    #[error("method {method} has {actual} pricing but the evaluator expects {expected}")]
    KindMismatch {
        method: ShippingMethodId,
        expected: MethodKind,
        actual: MethodKind,
    },
}

/// Errors confirming a shipping selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The chosen method was not part of the quoted set.
    #[error("shipping method {0} was not in the quoted set")]
    NotQuoted(ShippingMethodId),
}
