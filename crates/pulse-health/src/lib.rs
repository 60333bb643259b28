//! Weighted health scoring.
//!
//! Every subject starts at 100. Detected conditions ([`Finding`]s) deduct
//! the penalty configured for their [`ConditionKind`]: `points` per
//! occurrence, capped at `max` per kind, with the total floored at 0.
//!
//! Detection and scoring are separate. A type implements [`Scorable`] to
//! report its findings; [`HealthScorer`] turns findings into a score using
//! a [`HealthWeights`] table, so weights can be tuned without touching
//! detection code.
//!
//! ```rust
//! use pulse_health::{ConditionKind, Finding, HealthScorer, HealthStatus};
//!
//! let scorer = HealthScorer::default();
//! let findings = [
//!     Finding::new(ConditionKind::NodeNotReady, "node is not ready"),
//!     Finding::repeated(ConditionKind::NodeTainted, 2, "node has taints"),
//! ];
//! let score = scorer.score_findings(&findings);
//! assert_eq!(score, 40);
//! assert_eq!(HealthStatus::from_score(score), HealthStatus::Critical);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod scorer;
pub mod subjects;
pub mod weights;

pub use error::{HealthConfigError, Result};
pub use scorer::{Assessment, Finding, HealthScorer, HealthStatus, MAX_SCORE, Scorable};
pub use subjects::{NamespaceLoad, NodeUsage};
pub use weights::{ConditionKind, HealthThresholds, HealthWeights, Penalty};
