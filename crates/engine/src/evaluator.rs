//! Layered permission evaluation.
//!
//! A check runs in stages: local constraints (roles, level, user kind,
//! custom predicate) first, then the per-operation verdict from the cache
//! or the authorization service, then the risk gate. Local failures settle
//! the decision without spending a network call; remote failures resolve
//! fail-closed. Every check ends in exactly one recorded access event,
//! whatever path it took.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use parapet_auth::{Claims, PermissionLevel, UserKind};
use parapet_client::{AiAnalysis, AuthApi, PermissionCheckRequest};
use parapet_risk::{AccessPatternEvent, evaluate_gate};

use crate::context::SecurityContext;
use crate::error::SessionError;
use crate::recorder::AccessPatternRecorder;
use crate::store::SessionStore;

type ConstraintFn = Box<dyn Fn(&Claims, &SecurityContext) -> bool + Send + Sync>;

/// Constraints for one authorization check.
///
/// Build with [`CheckRequest::new`] for a concrete operation (consults the
/// cache and the authorization service) or [`CheckRequest::local`] for
/// pure role/level gating of UI affordances, then chain `with_` builders.
/// Roles and user kinds use ANY-of semantics; the permission level is a
/// minimum; everything combines with AND.
pub struct CheckRequest {
    resource: Option<String>,
    action: Option<String>,
    required_roles: Vec<String>,
    required_level: Option<PermissionLevel>,
    allowed_kinds: Vec<UserKind>,
    max_risk: Option<f64>,
    use_cache: bool,
    context: serde_json::Value,
    constraint: Option<ConstraintFn>,
}

impl CheckRequest {
    /// Check for one `(resource, action)` operation.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            action: Some(action.into()),
            ..Self::local()
        }
    }

    /// Check with no remote component; only local constraints apply.
    pub fn local() -> Self {
        Self {
            resource: None,
            action: None,
            required_roles: Vec::new(),
            required_level: None,
            allowed_kinds: Vec::new(),
            max_risk: None,
            use_cache: true,
            context: serde_json::Value::Null,
            constraint: None,
        }
    }

    /// Require at least one of `roles` to be an active role.
    pub fn with_required_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Require the holder's level to meet `level` on the ordinal ladder.
    pub fn with_required_level(mut self, level: PermissionLevel) -> Self {
        self.required_level = Some(level);
        self
    }

    /// Require the account to be at least one of `kinds`.
    pub fn with_allowed_kinds(mut self, kinds: impl IntoIterator<Item = UserKind>) -> Self {
        self.allowed_kinds = kinds.into_iter().collect();
        self
    }

    /// Deny when the combined risk strictly exceeds `threshold`.
    pub fn with_max_risk(mut self, threshold: f64) -> Self {
        self.max_risk = Some(threshold);
        self
    }

    /// Forward free-form context to the server-side risk model.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Skip the cache for this check; the fresh result is still cached.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Arbitrary caller-supplied constraint over the claims and the
    /// security context. A panic in the predicate denies the check.
    pub fn with_constraint<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Claims, &SecurityContext) -> bool + Send + Sync + 'static,
    {
        self.constraint = Some(Box::new(predicate));
        self
    }

    /// Threshold applied when the caller did not set one explicitly.
    pub(crate) fn with_default_max_risk(mut self, threshold: f64) -> Self {
        self.max_risk.get_or_insert(threshold);
        self
    }
}

/// The stage that produced the operation verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Local constraints settled the check (including "not authenticated");
    /// no per-operation verdict was needed or available.
    Local,
    /// A cached verdict for this `(resource, action)` was reused.
    Cache,
    /// The authorization service was consulted.
    Remote,
}

/// Outcome of one authorization check.
///
/// A denial is a value, not an error: `reasons` lists every failed
/// constraint in evaluation order (empty on allow). `risk_score` is the
/// combined risk attributed to the decision, also attached to the recorded
/// access event. A risk-gate override keeps the `source` of the verdict it
/// overrode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reasons: Vec<String>,
    pub risk_score: f64,
    pub source: DecisionSource,
    /// Server-side analysis, when the remote path returned one.
    pub analysis: Option<AiAnalysis>,
}

impl Decision {
    fn denied(reasons: Vec<String>, risk_score: f64, source: DecisionSource) -> Self {
        Self { allowed: false, reasons, risk_score, source, analysis: None }
    }
}

/// Cached verdict for one `(resource, action)` pair.
///
/// Entries are advisory: upserted on every fresh remote verdict, reused
/// until [`PermissionEvaluator::refresh_permissions`] clears the table.
/// There is no time-based expiry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PermissionCacheEntry {
    pub allowed: bool,
    pub risk_score: f64,
    pub computed_at: DateTime<Utc>,
}

/// The central decision engine.
///
/// Holds the permission cache and the security context; reads session
/// state from the store and records every decision through the recorder.
/// Consumers never see the cache directly.
pub struct PermissionEvaluator {
    api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    recorder: Arc<AccessPatternRecorder>,
    cache: Mutex<HashMap<(String, String), PermissionCacheEntry>>,
    context: Mutex<SecurityContext>,
}

impl PermissionEvaluator {
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: Arc<SessionStore>,
        recorder: Arc<AccessPatternRecorder>,
    ) -> Self {
        Self {
            api,
            store,
            recorder,
            cache: Mutex::new(HashMap::new()),
            context: Mutex::new(SecurityContext::default()),
        }
    }

    /// Evaluate one check and record its outcome.
    ///
    /// The future resolves on the cache-hit and local-denial paths without
    /// touching the network; the contract is uniform either way. Concurrent
    /// checks for the same `(resource, action)` are not coalesced: both
    /// miss the cache and both ask the service.
    pub async fn check(&self, request: CheckRequest) -> Decision {
        let state = self.store.state();
        let decision = match state.session() {
            None => Decision::denied(
                vec!["Not authenticated".to_string()],
                0.0,
                DecisionSource::Local,
            ),
            Some(session) => {
                let security = self.security_context();
                self.evaluate(&session.claims, session.raw_token(), &security, &request)
                    .await
            }
        };

        self.recorder.record(AccessPatternEvent::new(
            Utc::now(),
            request.resource.clone().unwrap_or_default(),
            request.action.clone().unwrap_or_default(),
            decision.allowed,
            decision.risk_score,
        ));

        tracing::debug!(
            resource = request.resource.as_deref().unwrap_or(""),
            action = request.action.as_deref().unwrap_or(""),
            allowed = decision.allowed,
            risk = decision.risk_score,
            source = ?decision.source,
            "authorization check",
        );
        decision
    }

    /// Pull fresh grants and predictions from the authorization service.
    ///
    /// Replaces the security context wholesale, clears the permission
    /// cache so stale verdicts cannot outlive a role change, and replaces
    /// the session's risk profile when the response carries one.
    pub async fn refresh_permissions(&self) -> Result<(), SessionError> {
        let Some(token) = self.store.raw_token() else {
            return Err(SessionError::NotAuthenticated);
        };

        let response = self.api.refresh_permissions(&token).await?;

        let granted = response.permissions.len();
        *lock(&self.context) = SecurityContext::new(response.permissions, response.ai_predictions);
        lock(&self.cache).clear();
        if let Some(profile) = response.risk_profile {
            self.store.replace_risk_profile(profile);
        }

        tracing::info!(granted, "permissions refreshed, verdict cache cleared");
        Ok(())
    }

    /// Snapshot of the current security context.
    pub fn security_context(&self) -> SecurityContext {
        lock(&self.context).clone()
    }

    async fn evaluate(
        &self,
        claims: &Claims,
        token: &str,
        security: &SecurityContext,
        request: &CheckRequest,
    ) -> Decision {
        let user_risk = claims.risk_profile.score();

        // Stage 1: every local constraint is evaluated so the reasons list
        // is complete, not just the first failure.
        let mut reasons = self.local_failures(claims, security, request);
        if !reasons.is_empty() {
            return Decision::denied(reasons, user_risk, DecisionSource::Local);
        }

        // Stage 2: per-operation verdict, cache first.
        let mut allowed = true;
        let mut source = DecisionSource::Local;
        let mut analysis = None;
        let mut predicted = None;

        if let (Some(resource), Some(action)) = (&request.resource, &request.action) {
            let cached = if request.use_cache { self.cached(resource, action) } else { None };

            match cached {
                Some(entry) => {
                    allowed = entry.allowed;
                    predicted = Some(entry.risk_score);
                    source = DecisionSource::Cache;
                }
                None => {
                    let call = PermissionCheckRequest::new(resource.clone(), action.clone())
                        .with_context(request.context.clone());

                    match self.api.check_permission(token, &call).await {
                        Ok(response) => {
                            allowed = response.allowed;
                            source = DecisionSource::Remote;

                            let effective = response
                                .ai_analysis
                                .as_ref()
                                .map(|a| a.risk_score)
                                .or_else(|| security.predicted_risk(resource))
                                .unwrap_or(0.0);
                            predicted = Some(effective);
                            analysis = response.ai_analysis;

                            self.upsert(resource, action, allowed, effective);
                        }
                        Err(err) => {
                            // Fail closed and leave the cache alone: the next
                            // check retries instead of replaying the outage.
                            tracing::warn!(%resource, %action, "permission check failed: {err}");
                            return Decision::denied(
                                vec![format!("Permission check failed: {err}")],
                                1.0,
                                DecisionSource::Remote,
                            );
                        }
                    }
                }
            }

            if !allowed {
                reasons.push("Denied by authorization service".to_string());
            }
        }

        // Stage 3: the risk gate runs last and can only revoke an allow.
        let predicted = predicted
            .or_else(|| request.resource.as_deref().and_then(|r| security.predicted_risk(r)))
            .unwrap_or(0.0);
        let threshold = request.max_risk.unwrap_or(1.0);
        let gate = evaluate_gate(user_risk, predicted, threshold);
        if !gate.allowed {
            allowed = false;
            reasons.push(format!(
                "Risk {:.2} exceeds threshold {threshold:.2}",
                gate.combined_risk
            ));
        }

        Decision { allowed, reasons, risk_score: gate.combined_risk, source, analysis }
    }

    fn local_failures(
        &self,
        claims: &Claims,
        security: &SecurityContext,
        request: &CheckRequest,
    ) -> Vec<String> {
        let mut reasons = Vec::new();

        if !request.required_roles.is_empty() && !claims.has_any_role(&request.required_roles) {
            reasons.push(format!(
                "Missing required role (any of: {})",
                request.required_roles.join(", ")
            ));
        }

        if let Some(required) = &request.required_level {
            if !claims.meets_level(required) {
                reasons.push(format!(
                    "Insufficient permission level: {} does not meet {required}",
                    claims.permission_level
                ));
            }
        }

        if !request.allowed_kinds.is_empty() && !claims.is_any_kind(&request.allowed_kinds) {
            let kinds: Vec<&str> = request.allowed_kinds.iter().map(kind_label).collect();
            reasons.push(format!("User type not permitted (any of: {})", kinds.join(", ")));
        }

        if let Some(predicate) = &request.constraint {
            match catch_unwind(AssertUnwindSafe(|| predicate(claims, security))) {
                Ok(true) => {}
                Ok(false) => reasons.push("Custom constraint failed".to_string()),
                Err(_) => {
                    tracing::error!(user = %claims.username, "custom constraint panicked, denying");
                    reasons.push("Custom constraint failed".to_string());
                }
            }
        }

        reasons
    }

    fn cached(&self, resource: &str, action: &str) -> Option<PermissionCacheEntry> {
        lock(&self.cache)
            .get(&(resource.to_string(), action.to_string()))
            .copied()
    }

    fn upsert(&self, resource: &str, action: &str, allowed: bool, risk_score: f64) {
        lock(&self.cache).insert(
            (resource.to_string(), action.to_string()),
            PermissionCacheEntry { allowed, risk_score, computed_at: Utc::now() },
        );
    }
}

fn kind_label(kind: &UserKind) -> &'static str {
    match kind {
        UserKind::Staff => "staff",
        UserKind::Superuser => "superuser",
    }
}

/// Cache and context hold plain data; a poisoning panic elsewhere must not
/// take authorization down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
