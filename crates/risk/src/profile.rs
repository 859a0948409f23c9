//! Per-user risk profiles as issued by the authorization service.
//!
//! A profile travels inside the access token claims and is refreshed
//! whenever the server recomputes it. The client never recalculates the
//! score locally; it only reads it, and the accessors force values that
//! left the documented range back into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate counters the server derived the risk score from.
///
/// Carried for display and diagnostics; none of the local decision paths
/// read these directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    /// Total authorization checks observed for this user.
    pub request_count: u64,
    /// Checks that ended in a denial or an error.
    pub failure_count: u64,
    /// Fraction of checks that succeeded, in `[0.0, 1.0]`.
    pub success_rate: f64,
}

impl Default for BaselineMetrics {
    fn default() -> Self {
        Self { request_count: 0, failure_count: 0, success_rate: 1.0 }
    }
}

/// Server-computed risk assessment for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub baseline: BaselineMetrics,
    /// Model output in `[0.0, 1.0]`; higher means riskier.
    pub ai_risk_score: f64,
    pub calculated_at: DateTime<Utc>,
}

impl RiskProfile {
    /// The risk score, forced back into `[0.0, 1.0]`.
    ///
    /// A non-finite score means the upstream model misbehaved; that maps
    /// to `1.0` so the caller denies rather than waves it through.
    pub fn score(&self) -> f64 {
        if self.ai_risk_score.is_finite() {
            self.ai_risk_score.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self {
            baseline: BaselineMetrics::default(),
            ai_risk_score: 0.0,
            calculated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
