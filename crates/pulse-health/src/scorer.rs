//! Score computation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::weights::{ConditionKind, HealthThresholds, HealthWeights};

/// Highest possible score.
pub const MAX_SCORE: u8 = 100;

/// One detected condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// What was detected.
    pub kind: ConditionKind,
    /// How many times it counts against the score.
    pub occurrences: u32,
    /// Human-readable description, used as an error indicator.
    pub detail: String,
}

impl Finding {
    /// Creates a single-occurrence finding.
    #[must_use]
    pub fn new(kind: ConditionKind, detail: impl Into<String>) -> Self {
        Self::repeated(kind, 1, detail)
    }

    /// Creates a finding that counts `occurrences` times.
    #[must_use]
    pub fn repeated(kind: ConditionKind, occurrences: u32, detail: impl Into<String>) -> Self {
        Self {
            kind,
            occurrences,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Coarse health classification of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Score of 80 or more.
    Healthy,
    /// Score of 50 to 79.
    Degraded,
    /// Score below 50.
    Critical,
}

impl HealthStatus {
    /// Classifies a score.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 80 {
            Self::Healthy
        } else if score >= 50 {
            Self::Degraded
        } else {
            Self::Critical
        }
    }

    /// Returns true if the status needs an operator's attention.
    #[must_use]
    pub const fn requires_attention(self) -> bool {
        matches!(self, Self::Degraded | Self::Critical)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// Something whose conditions can be detected.
pub trait Scorable {
    /// Returns every condition detected on the subject.
    fn findings(&self, thresholds: &HealthThresholds) -> Vec<Finding>;
}

impl Scorable for [Finding] {
    fn findings(&self, _thresholds: &HealthThresholds) -> Vec<Finding> {
        self.to_vec()
    }
}

/// The result of scoring one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Score from 0 to 100.
    pub score: u8,
    /// Classification of the score.
    pub status: HealthStatus,
    /// Conditions that were detected.
    pub findings: Vec<Finding>,
}

impl Assessment {
    /// Returns the finding details, in detection order.
    #[must_use]
    pub fn indicators(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.detail.clone()).collect()
    }
}

/// Turns findings into scores using a weight table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthScorer {
    weights: HealthWeights,
    thresholds: HealthThresholds,
}

impl HealthScorer {
    /// Creates a scorer.
    #[must_use]
    pub const fn new(weights: HealthWeights, thresholds: HealthThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Returns the weight table.
    #[must_use]
    pub const fn weights(&self) -> &HealthWeights {
        &self.weights
    }

    /// Returns the detection thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    /// Scores a subject.
    #[must_use]
    pub fn score<S: Scorable + ?Sized>(&self, subject: &S) -> u8 {
        self.score_findings(&subject.findings(&self.thresholds))
    }

    /// Scores a subject and keeps its findings.
    #[must_use]
    pub fn assess<S: Scorable + ?Sized>(&self, subject: &S) -> Assessment {
        let findings = subject.findings(&self.thresholds);
        let score = self.score_findings(&findings);
        Assessment {
            score,
            status: HealthStatus::from_score(score),
            findings,
        }
    }

    /// Starts at 100 and deducts each kind's capped penalty, flooring at 0.
    #[must_use]
    pub fn score_findings(&self, findings: &[Finding]) -> u8 {
        let mut occurrences: BTreeMap<ConditionKind, u32> = BTreeMap::new();
        for finding in findings {
            let count = occurrences.entry(finding.kind).or_insert(0);
            *count = count.saturating_add(finding.occurrences);
        }

        let deducted: u32 = occurrences
            .into_iter()
            .map(|(kind, count)| {
                let deduction = self.weights.penalty(kind).deduction(count);
                trace!(condition = %kind, count, deduction, "health deduction");
                deduction
            })
            .fold(0, u32::saturating_add);

        u32::from(MAX_SCORE).saturating_sub(deducted) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::Penalty;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(100, HealthStatus::Healthy)]
    #[test_case(80, HealthStatus::Healthy)]
    #[test_case(79, HealthStatus::Degraded)]
    #[test_case(50, HealthStatus::Degraded)]
    #[test_case(49, HealthStatus::Critical)]
    #[test_case(0, HealthStatus::Critical)]
    fn status_bands(score: u8, expected: HealthStatus) {
        assert_eq!(HealthStatus::from_score(score), expected);
    }

    #[test]
    fn no_findings_scores_full() {
        assert_eq!(HealthScorer::default().score_findings(&[]), 100);
    }

    #[test]
    fn repeated_kind_is_capped() {
        let scorer = HealthScorer::default();
        let findings = vec![
            Finding::repeated(ConditionKind::ContainerRestarts, 4, "a restarted 4 times"),
            Finding::repeated(ConditionKind::ContainerRestarts, 9, "b restarted 9 times"),
        ];
        assert_eq!(scorer.score_findings(&findings), 75);
    }

    #[test]
    fn deductions_floor_at_zero() {
        let scorer = HealthScorer::default();
        let findings = vec![
            Finding::new(ConditionKind::NodeNotReady, "not ready"),
            Finding::new(ConditionKind::NetworkUnavailable, "network"),
            Finding::new(ConditionKind::MemoryPressure, "memory"),
        ];
        assert_eq!(scorer.score_findings(&findings), 0);
    }

    #[test]
    fn custom_weights_apply() {
        let weights =
            HealthWeights::default().with_penalty(ConditionKind::PodPending, Penalty::new(10, 10));
        let scorer = HealthScorer::new(weights, HealthThresholds::default());
        let findings = [Finding::new(ConditionKind::PodPending, "pending")];
        let assessment = scorer.assess(&findings[..]);
        assert_eq!(assessment.score, 90);
        assert_eq!(assessment.status, HealthStatus::Healthy);
        assert_eq!(assessment.indicators(), vec!["pending".to_string()]);
    }

    fn any_kind() -> impl Strategy<Value = ConditionKind> {
        proptest::sample::select(
            ConditionKind::DEFAULTS
                .iter()
                .map(|(kind, _)| *kind)
                .collect::<Vec<_>>(),
        )
    }

    proptest! {
        #[test]
        fn score_stays_in_range(
            raw in proptest::collection::vec((any_kind(), 0u32..50), 0..40)
        ) {
            let findings: Vec<Finding> = raw
                .into_iter()
                .map(|(kind, n)| Finding::repeated(kind, n, "x"))
                .collect();
            let score = HealthScorer::default().score_findings(&findings);
            prop_assert!(score <= 100);
        }

        #[test]
        fn more_findings_never_raise_the_score(
            raw in proptest::collection::vec((any_kind(), 1u32..5), 1..20),
            extra in any_kind()
        ) {
            let scorer = HealthScorer::default();
            let mut findings: Vec<Finding> = raw
                .into_iter()
                .map(|(kind, n)| Finding::repeated(kind, n, "x"))
                .collect();
            let before = scorer.score_findings(&findings);
            findings.push(Finding::new(extra, "extra"));
            prop_assert!(scorer.score_findings(&findings) <= before);
        }
    }
}
