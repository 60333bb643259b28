//! Anomalies recorded while parsing quantities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A problem detected while parsing a quantity string.
///
/// Anomalies travel inside the returned [`Quantity`](crate::Quantity)
/// instead of being returned as `Err`, so callers can keep aggregating.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum QuantityAnomaly {
    /// No value was supplied.
    #[error("quantity is missing")]
    Missing,

    /// The numeric part could not be parsed.
    #[error("unparseable quantity '{input}'")]
    Malformed {
        /// The raw input.
        input: String,
    },

    /// The suffix is not a recognized unit for this resource.
    #[error("unknown unit suffix '{suffix}' in '{input}'")]
    UnknownSuffix {
        /// The raw input.
        input: String,
        /// The unrecognized suffix.
        suffix: String,
    },

    /// The value was negative and has been clamped to zero.
    #[error("negative quantity '{input}' clamped to zero")]
    Negative {
        /// The raw input.
        input: String,
    },

    /// The value exceeds the sanity ceiling or is not finite.
    #[error("quantity '{input}' is out of range")]
    OutOfRange {
        /// The raw input.
        input: String,
    },
}

impl QuantityAnomaly {
    /// Returns true if the anomaly replaced the value with the zero sentinel.
    ///
    /// `Negative` clamps rather than discards, every other anomaly means the
    /// input carried no usable number.
    #[must_use]
    pub const fn is_unparseable(&self) -> bool {
        !matches!(self, Self::Negative { .. })
    }
}
