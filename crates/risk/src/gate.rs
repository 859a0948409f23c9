//! Threshold gate combining user and operation risk.
//!
//! The gate is the last stop in an authorization decision: by the time it
//! runs, role and level checks have already passed. It folds the user's
//! profile score and the score predicted for the requested operation into
//! a single value and compares that against a caller-supplied threshold.

use serde::{Deserialize, Serialize};

/// Outcome of a gate evaluation.
///
/// `combined_risk` is reported on both outcomes so callers can log it and
/// attach it to the recorded access event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    pub combined_risk: f64,
}

/// Evaluates the risk gate for one operation.
///
/// The combined risk is the maximum of the two inputs after each is forced
/// into `[0.0, 1.0]` (non-finite values count as `1.0`). The decision is a
/// denial only when the combined risk strictly exceeds `threshold`; a
/// score exactly at the threshold passes. A threshold of `1.0` therefore
/// never denies, which is the documented behaviour for interactive
/// surfaces that prefer to warn instead of block.
pub fn evaluate_gate(user_risk: f64, predicted_risk: f64, threshold: f64) -> GateDecision {
    let combined = sanitize(user_risk).max(sanitize(predicted_risk));
    GateDecision { allowed: !(combined > threshold), combined_risk: combined }
}

fn sanitize(score: f64) -> f64 {
    if score.is_finite() { score.clamp(0.0, 1.0) } else { 1.0 }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_when_combined_risk_is_below_threshold() {
        let decision = evaluate_gate(0.2, 0.5, 0.8);
        assert!(decision.allowed);
        assert_eq!(decision.combined_risk, 0.5);
    }

    #[test]
    fn allows_when_combined_risk_equals_threshold() {
        // The comparison is strict: sitting exactly on the line passes.
        let decision = evaluate_gate(0.8, 0.3, 0.8);
        assert!(decision.allowed);
        assert_eq!(decision.combined_risk, 0.8);
    }

    #[test]
    fn denies_when_combined_risk_exceeds_threshold() {
        let decision = evaluate_gate(0.1, 0.81, 0.8);
        assert!(!decision.allowed);
        assert_eq!(decision.combined_risk, 0.81);

        // Either side can push the combined score over the line.
        let decision = evaluate_gate(0.9, 0.2, 0.8);
        assert!(!decision.allowed);
        assert_eq!(decision.combined_risk, 0.9);
    }

    #[test]
    fn combined_risk_takes_the_larger_input() {
        assert_eq!(evaluate_gate(0.9, 0.2, 0.5).combined_risk, 0.9);
        assert_eq!(evaluate_gate(0.2, 0.9, 0.5).combined_risk, 0.9);
    }

    #[test]
    fn non_finite_scores_count_as_maximum_risk() {
        let decision = evaluate_gate(f64::NAN, 0.0, 0.8);
        assert!(!decision.allowed);
        assert_eq!(decision.combined_risk, 1.0);
    }

    #[test]
    fn permissive_threshold_never_denies() {
        assert!(evaluate_gate(1.0, 1.0, 1.0).allowed);
        assert!(evaluate_gate(f64::INFINITY, 0.0, 1.0).allowed);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig { cases: 1000, ..ProptestConfig::default() })]

            #[test]
            fn decision_matches_strict_comparison(
                user in 0.0f64..=1.0,
                predicted in 0.0f64..=1.0,
                threshold in 0.0f64..=1.0,
            ) {
                let decision = evaluate_gate(user, predicted, threshold);
                prop_assert_eq!(decision.allowed, !(user.max(predicted) > threshold));
            }

            #[test]
            fn combined_risk_is_the_max_of_sanitized_inputs(
                user in -2.0f64..=2.0,
                predicted in -2.0f64..=2.0,
            ) {
                let decision = evaluate_gate(user, predicted, 0.5);
                let expected = user.clamp(0.0, 1.0).max(predicted.clamp(0.0, 1.0));
                prop_assert_eq!(decision.combined_risk, expected);
            }

            #[test]
            fn raising_the_threshold_never_revokes_access(
                user in 0.0f64..=1.0,
                predicted in 0.0f64..=1.0,
                low in 0.0f64..=1.0,
                bump in 0.0f64..=1.0,
            ) {
                let at_low = evaluate_gate(user, predicted, low);
                let at_high = evaluate_gate(user, predicted, (low + bump).min(1.0));
                if at_low.allowed {
                    prop_assert!(at_high.allowed);
                }
            }
        }
    }
}
