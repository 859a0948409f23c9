//! Server-granted security context.
//!
//! The context is the engine's copy of what `/refresh-permissions` last
//! returned: the flat list of granted permission strings and the predicted
//! risk score per resource. It is replaced wholesale on every refresh and
//! never edited field by field, so a reader always sees one consistent
//! generation of server state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Snapshot of the permissions and risk predictions granted to the
/// current session.
///
/// Custom check predicates receive a `&SecurityContext` alongside the
/// claims; they can read it but cannot mutate the engine's copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    permissions: Vec<String>,
    ai_predictions: HashMap<String, f64>,
}

impl SecurityContext {
    pub fn new(permissions: Vec<String>, ai_predictions: HashMap<String, f64>) -> Self {
        Self { permissions, ai_predictions }
    }

    /// Exact-match membership in the granted permission list.
    pub fn is_granted(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Predicted risk for a resource, when the server supplied one.
    pub fn predicted_risk(&self, resource: &str) -> Option<f64> {
        self.ai_predictions.get(resource).copied()
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn predictions(&self) -> &HashMap<String, f64> {
        &self.ai_predictions
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.ai_predictions.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
