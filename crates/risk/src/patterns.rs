use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Risk score at or above which an event counts as high-risk in summaries.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;

/// One recorded authorization decision.
///
/// Events are produced by the engine once per decision and kept in a
/// bounded, most-recent-first buffer; the functions here treat the slice
/// as unordered and filter by timestamp instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPatternEvent {
    pub occurred_at: DateTime<Utc>,
    pub resource: String,
    pub action: String,
    pub success: bool,
    pub risk_score: f64,
}

impl AccessPatternEvent {
    pub fn new(
        occurred_at: DateTime<Utc>,
        resource: impl Into<String>,
        action: impl Into<String>,
        success: bool,
        risk_score: f64,
    ) -> Self {
        Self {
            occurred_at,
            resource: resource.into(),
            action: action.into(),
            success,
            risk_score,
        }
    }
}

/// Read-only aggregates over a window of access events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub total: usize,
    pub denied: usize,
    pub high_risk: usize,
    pub mean_risk: f64,
}

impl PatternSummary {
    pub fn empty() -> Self {
        Self { total: 0, denied: 0, high_risk: 0, mean_risk: 0.0 }
    }
}

/// Heuristic judgement over recent access behaviour.
///
/// `severity` and `confidence` are both in `[0.0, 1.0]`; confidence grows
/// with sample size so a single denial right after login does not light up
/// a banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAssessment {
    pub severity: f64,
    pub confidence: f64,
    pub explanation: String,
}

/// Aggregates the events that fall inside `window` ending at `now`.
pub fn summarize(
    events: &[AccessPatternEvent],
    window: Duration,
    now: DateTime<Utc>,
) -> PatternSummary {
    let cutoff = now - window;
    let mut summary = PatternSummary::empty();
    let mut risk_sum = 0.0;

    for event in events.iter().filter(|e| e.occurred_at > cutoff && e.occurred_at <= now) {
        summary.total += 1;
        if !event.success {
            summary.denied += 1;
        }
        if event.risk_score >= HIGH_RISK_THRESHOLD {
            summary.high_risk += 1;
        }
        risk_sum += event.risk_score;
    }

    if summary.total > 0 {
        summary.mean_risk = risk_sum / summary.total as f64;
    }
    summary
}

/// Scores how anomalous the recent window looks.
///
/// Model:
/// - Denial ratio and high-risk density are each a fraction of the window.
/// - Severity is the larger of the two; a clean window scores 0.0.
/// - Confidence ramps linearly until `CONFIDENT_SAMPLE` events are seen.
pub fn assess(
    events: &[AccessPatternEvent],
    window: Duration,
    now: DateTime<Utc>,
) -> PatternAssessment {
    const CONFIDENT_SAMPLE: usize = 20;

    let summary = summarize(events, window, now);
    if summary.total == 0 {
        return PatternAssessment {
            severity: 0.0,
            confidence: 0.0,
            explanation: "no access events in the observed window".to_string(),
        };
    }

    let denial_ratio = summary.denied as f64 / summary.total as f64;
    let high_risk_ratio = summary.high_risk as f64 / summary.total as f64;
    let severity = denial_ratio.max(high_risk_ratio).clamp(0.0, 1.0);
    let confidence = (summary.total as f64 / CONFIDENT_SAMPLE as f64).min(1.0);

    let explanation = format!(
        "{} of {} checks denied, {} scored at or above {HIGH_RISK_THRESHOLD:.2}, mean risk {:.2}",
        summary.denied, summary.total, summary.high_risk, summary.mean_risk
    );

    PatternAssessment { severity, confidence, explanation }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(now: DateTime<Utc>, minutes_ago: i64, success: bool, risk: f64) -> AccessPatternEvent {
        AccessPatternEvent::new(
            now - Duration::minutes(minutes_ago),
            "reports",
            "view",
            success,
            risk,
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn summarize_counts_only_events_inside_the_window() {
        let now = fixed_now();
        let events = vec![
            at(now, 1, true, 0.2),
            at(now, 5, false, 0.9),
            at(now, 30, false, 0.9), // outside a 15-minute window
        ];

        let summary = summarize(&events, Duration::minutes(15), now);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.denied, 1);
        assert_eq!(summary.high_risk, 1);
        assert!((summary.mean_risk - 0.55).abs() < 1e-9);
    }

    #[test]
    fn summarize_of_empty_slice_is_all_zero() {
        let summary = summarize(&[], Duration::minutes(15), fixed_now());
        assert_eq!(summary, PatternSummary::empty());
    }

    #[test]
    fn high_risk_threshold_is_inclusive() {
        let now = fixed_now();
        let events = vec![at(now, 1, true, HIGH_RISK_THRESHOLD)];
        let summary = summarize(&events, Duration::minutes(15), now);
        assert_eq!(summary.high_risk, 1);
    }

    #[test]
    fn assess_reports_zero_for_an_empty_window() {
        let assessment = assess(&[], Duration::minutes(15), fixed_now());
        assert_eq!(assessment.severity, 0.0);
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn assess_scales_severity_with_denial_ratio() {
        let now = fixed_now();
        let events = vec![
            at(now, 1, false, 0.1),
            at(now, 2, false, 0.1),
            at(now, 3, true, 0.1),
            at(now, 4, true, 0.1),
        ];

        let assessment = assess(&events, Duration::minutes(15), now);
        assert!((assessment.severity - 0.5).abs() < 1e-9);
        assert!(assessment.confidence > 0.0);
        assert!(assessment.explanation.contains("2 of 4 checks denied"));
    }

    #[test]
    fn assess_confidence_grows_with_sample_size() {
        let now = fixed_now();
        let few: Vec<_> = (0..2).map(|i| at(now, i, true, 0.1)).collect();
        let many: Vec<_> = (0..40).map(|i| at(now, i % 10, true, 0.1)).collect();

        let sparse = assess(&few, Duration::minutes(15), now);
        let dense = assess(&many, Duration::minutes(15), now);
        assert!(sparse.confidence < dense.confidence);
        assert_eq!(dense.confidence, 1.0);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_event(now: DateTime<Utc>) -> impl Strategy<Value = AccessPatternEvent> {
            (0i64..120, any::<bool>(), 0.0f64..=1.0).prop_map(move |(age, success, risk)| {
                AccessPatternEvent::new(now - Duration::minutes(age), "r", "a", success, risk)
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig { cases: 1000, ..ProptestConfig::default() })]

            #[test]
            fn severity_and_confidence_stay_in_unit_range(
                events in proptest::collection::vec(
                    arb_event(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
                    0..50,
                ),
            ) {
                let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
                let assessment = assess(&events, Duration::minutes(60), now);
                prop_assert!((0.0..=1.0).contains(&assessment.severity));
                prop_assert!((0.0..=1.0).contains(&assessment.confidence));
            }

            #[test]
            fn summary_counters_never_exceed_total(
                events in proptest::collection::vec(
                    arb_event(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
                    0..50,
                ),
            ) {
                let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
                let summary = summarize(&events, Duration::minutes(60), now);
                prop_assert!(summary.denied <= summary.total);
                prop_assert!(summary.high_risk <= summary.total);
            }
        }
    }
}
