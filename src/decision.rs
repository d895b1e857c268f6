//! Decision bands over the model's probability of default
//!
//! Maps a continuous risk score onto three contiguous, non-overlapping,
//! exhaustive bands using two ordered thresholds. Boundaries belong to the
//! higher-risk band; an absent probability maps to `Unknown`.

use serde::{Deserialize, Serialize};

use crate::contracts::DecisionThresholds;

/// Discrete outcome derived from a probability of default.
///
/// Never stored independently of the probability that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Probability below the approve threshold
    Approve,
    /// Probability in the conditional band
    ConditionalApproval,
    /// Probability at or above the conditional threshold
    Reject,
    /// Model exposes no calibrated probability
    Unknown,
}

impl Decision {
    /// Wire label for this decision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "APPROVE",
            Decision::ConditionalApproval => "CONDITIONAL_APPROVAL",
            Decision::Reject => "REJECT",
            Decision::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a probability of default onto a decision band.
///
/// Thresholds are half-open intervals:
/// - `p < approve` → `Approve`
/// - `approve ≤ p < conditional` → `ConditionalApproval`
/// - `p ≥ conditional` → `Reject`
/// - absent `p` → `Unknown`
pub fn decide(probability: Option<f64>, thresholds: &DecisionThresholds) -> Decision {
    let Some(p) = probability else {
        return Decision::Unknown;
    };
    if p < thresholds.approve() {
        Decision::Approve
    } else if p < thresholds.conditional() {
        Decision::ConditionalApproval
    } else {
        Decision::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn thresholds(approve: f64, conditional: f64) -> DecisionThresholds {
        DecisionThresholds::new(approve, conditional).unwrap()
    }

    #[test]
    fn test_absent_probability_is_unknown() {
        assert_eq!(decide(None, &thresholds(0.3, 0.6)), Decision::Unknown);
    }

    #[test]
    fn test_bands() {
        let t = thresholds(0.3, 0.6);
        assert_eq!(decide(Some(0.0), &t), Decision::Approve);
        assert_eq!(decide(Some(0.29), &t), Decision::Approve);
        assert_eq!(decide(Some(0.45), &t), Decision::ConditionalApproval);
        assert_eq!(decide(Some(0.75), &t), Decision::Reject);
        assert_eq!(decide(Some(1.0), &t), Decision::Reject);
    }

    #[test]
    fn test_boundaries_belong_to_higher_risk_band() {
        let t = thresholds(0.3, 0.6);
        assert_eq!(decide(Some(0.3), &t), Decision::ConditionalApproval);
        assert_eq!(decide(Some(0.6), &t), Decision::Reject);
    }

    #[test]
    fn test_degenerate_thresholds() {
        // approve == conditional collapses the conditional band entirely.
        let t = thresholds(0.5, 0.5);
        assert_eq!(decide(Some(0.49), &t), Decision::Approve);
        assert_eq!(decide(Some(0.5), &t), Decision::Reject);
    }

    #[test]
    fn test_wire_labels() {
        assert_eq!(Decision::Approve.as_str(), "APPROVE");
        assert_eq!(Decision::ConditionalApproval.as_str(), "CONDITIONAL_APPROVAL");
        assert_eq!(
            serde_json::to_string(&Decision::Reject).unwrap(),
            "\"REJECT\""
        );
    }

    proptest! {
        /// The three bands are exhaustive and non-overlapping for any valid
        /// threshold pair: the decision is exactly determined by where the
        /// probability falls.
        #[test]
        fn prop_bands_exhaustive_and_exclusive(
            p in 0.0f64..=1.0,
            a in 0.0f64..=1.0,
            c in 0.0f64..=1.0,
        ) {
            let (a, c) = if a <= c { (a, c) } else { (c, a) };
            let t = thresholds(a, c);
            let decision = decide(Some(p), &t);

            let expected = if p < a {
                Decision::Approve
            } else if p < c {
                Decision::ConditionalApproval
            } else {
                Decision::Reject
            };
            prop_assert_eq!(decision, expected);
        }

        /// Decisions are monotonic in probability: a higher score never
        /// yields a lower-risk band.
        #[test]
        fn prop_monotonic_in_probability(
            p1 in 0.0f64..=1.0,
            p2 in 0.0f64..=1.0,
            a in 0.0f64..=1.0,
            c in 0.0f64..=1.0,
        ) {
            let (a, c) = if a <= c { (a, c) } else { (c, a) };
            let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            let t = thresholds(a, c);

            fn rank(d: Decision) -> u8 {
                match d {
                    Decision::Approve => 0,
                    Decision::ConditionalApproval => 1,
                    Decision::Reject => 2,
                    Decision::Unknown => unreachable!("probability was present"),
                }
            }
            prop_assert!(rank(decide(Some(lo), &t)) <= rank(decide(Some(hi), &t)));
        }
    }
}
