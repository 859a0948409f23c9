//! Engine configuration.
//!
//! All knobs have defaults matching the hosted deployment; tests and embedded
//! callers override individual fields through the `with_` builders.

use chrono::Duration;

/// Tunable settings for the authorization engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the authorization service (no trailing slash required).
    pub api_url: String,
    /// How long before access-token expiry the proactive renewal fires.
    pub renewal_lead: Duration,
    /// Risk threshold applied to UI-level checks when none is given explicitly.
    pub ui_risk_threshold: f64,
    /// Stricter risk threshold intended for route-level guards.
    pub route_risk_threshold: f64,
    /// Number of access-pattern events retained in memory, most recent first.
    pub pattern_capacity: usize,
    /// Depth of the telemetry send queue. When full, new events are dropped.
    pub telemetry_queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api/security".to_string(),
            renewal_lead: Duration::minutes(5),
            ui_risk_threshold: 1.0,
            route_risk_threshold: 0.8,
            pattern_capacity: 100,
            telemetry_queue_depth: 64,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_renewal_lead(mut self, lead: Duration) -> Self {
        self.renewal_lead = lead;
        self
    }

    pub fn with_ui_risk_threshold(mut self, threshold: f64) -> Self {
        self.ui_risk_threshold = threshold;
        self
    }

    pub fn with_route_risk_threshold(mut self, threshold: f64) -> Self {
        self.route_risk_threshold = threshold;
        self
    }

    pub fn with_pattern_capacity(mut self, capacity: usize) -> Self {
        self.pattern_capacity = capacity;
        self
    }

    pub fn with_telemetry_queue_depth(mut self, depth: usize) -> Self {
        self.telemetry_queue_depth = depth;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hosted_deployment() {
        let config = EngineConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000/api/security");
        assert_eq!(config.renewal_lead, Duration::minutes(5));
        assert_eq!(config.ui_risk_threshold, 1.0);
        assert_eq!(config.route_risk_threshold, 0.8);
        assert_eq!(config.pattern_capacity, 100);
        assert_eq!(config.telemetry_queue_depth, 64);
    }

    #[test]
    fn builders_override_single_fields() {
        let config = EngineConfig::new()
            .with_api_url("https://auth.example.com/api")
            .with_renewal_lead(Duration::seconds(30))
            .with_ui_risk_threshold(0.9)
            .with_route_risk_threshold(0.5)
            .with_pattern_capacity(10)
            .with_telemetry_queue_depth(4);

        assert_eq!(config.api_url, "https://auth.example.com/api");
        assert_eq!(config.renewal_lead, Duration::seconds(30));
        assert_eq!(config.ui_risk_threshold, 0.9);
        assert_eq!(config.route_risk_threshold, 0.5);
        assert_eq!(config.pattern_capacity, 10);
        assert_eq!(config.telemetry_queue_depth, 4);
    }
}
