//! Error types for the pulse-health crate.

use thiserror::Error;

use crate::weights::ConditionKind;

/// Invalid health configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthConfigError {
    /// A penalty is inconsistent.
    #[error("invalid penalty for {kind}: {reason}")]
    InvalidPenalty {
        /// The condition concerned.
        kind: ConditionKind,
        /// What is wrong.
        reason: String,
    },

    /// A threshold is out of range.
    #[error("invalid threshold {name}: {value}")]
    InvalidThreshold {
        /// Threshold name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Result type for health configuration checks.
pub type Result<T> = std::result::Result<T, HealthConfigError>;
