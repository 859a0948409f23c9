//! parapet-engine — the client-side authorization and session engine.
//!
//! The engine is what the dashboard shell embeds: it owns the session
//! lifecycle (decode, validate, proactively renew, persist), answers
//! layered permission checks (roles, ordinal levels, user kind, remote
//! verdicts, risk gating), and records every decision as an access
//! pattern for anomaly analysis, reporting each one upstream without
//! blocking the caller.
//!
//! [`AuthEngine`] composes the parts over one API client and is the only
//! surface UI collaborators should call; the pieces remain public for
//! hosts that need to wire them differently.
//!
//! ```no_run
//! use parapet_engine::{AuthEngine, CheckRequest, EngineConfig, PermissionLevel};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let engine = AuthEngine::new(EngineConfig::default())?;
//! engine.initialize().await?;
//!
//! let decision = engine
//!     .check(
//!         CheckRequest::new("finance_data", "view")
//!             .with_required_level(PermissionLevel::MANAGEMENT),
//!     )
//!     .await;
//! if decision.allowed {
//!     // render the affordance
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod recorder;
pub mod session;
pub mod store;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use parapet_client::{HttpAuthApi, SqliteCredentialStore};

pub use config::EngineConfig;
pub use context::SecurityContext;
pub use error::SessionError;
pub use evaluator::{
    CheckRequest, Decision, DecisionSource, PermissionCacheEntry, PermissionEvaluator,
};
pub use recorder::{AccessPatternRecorder, spawn_telemetry_drain};
pub use session::{Session, SessionState};
pub use store::SessionStore;

// Collaborator types that appear in this crate's public API.
pub use parapet_auth::{Claims, PermissionLevel, Role, UserKind};
pub use parapet_client::{AiAnalysis, AuthApi, CredentialStore};
pub use parapet_core::UserId;
pub use parapet_risk::{AccessPatternEvent, PatternAssessment, PatternSummary, RiskProfile};

/// The assembled authorization engine.
///
/// One instance per application. Wires the session store, the permission
/// evaluator, and the access pattern recorder over a shared API client,
/// and owns the background telemetry drain. Construction must happen
/// inside a Tokio runtime; the drain task starts immediately.
pub struct AuthEngine {
    config: EngineConfig,
    store: Arc<SessionStore>,
    evaluator: PermissionEvaluator,
    recorder: Arc<AccessPatternRecorder>,
    telemetry: Mutex<Option<JoinHandle<()>>>,
}

impl AuthEngine {
    /// Engine over the production backends: HTTP authorization service at
    /// `config.api_url` and SQLite credential storage in the OS data
    /// directory.
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let api = Arc::new(HttpAuthApi::new(&config.api_url));
        let credentials = Arc::new(SqliteCredentialStore::new()?);
        Ok(Self::with_backends(config, api, credentials))
    }

    /// Engine over explicit backends (tests, embedded hosts).
    pub fn with_backends(
        config: EngineConfig,
        api: Arc<dyn AuthApi>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let store = Arc::new(SessionStore::new(api.clone(), credentials, config.clone()));

        let (recorder, queue) =
            AccessPatternRecorder::new(config.pattern_capacity, config.telemetry_queue_depth);
        let recorder = Arc::new(recorder);
        let telemetry = recorder::spawn_telemetry_drain(queue, api.clone(), store.clone());

        let evaluator = PermissionEvaluator::new(api, store.clone(), recorder.clone());

        tracing::info!(api_url = %config.api_url, "authorization engine ready");
        Self {
            config,
            store,
            evaluator,
            recorder,
            telemetry: Mutex::new(Some(telemetry)),
        }
    }

    // ── Session lifecycle ────────────────────────────────────────────────────

    /// Restore the persisted session, refreshing an expired token once.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        self.store.initialize().await
    }

    /// Adopt a token pair from interactive authentication.
    pub async fn login(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Result<(), SessionError> {
        self.store.login(access_token, refresh_token).await
    }

    /// Force a token refresh now instead of waiting for the renewal timer.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        self.store.refresh().await
    }

    /// Notify the service best-effort, then clear all local session state.
    pub async fn logout(&self) {
        self.store.logout().await
    }

    /// Receiver for session state transitions (reactive UI binding).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    pub fn session_state(&self) -> SessionState {
        self.store.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn claims(&self) -> Option<Claims> {
        self.store.claims()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.store.expires_at()
    }

    // ── Authorization ────────────────────────────────────────────────────────

    /// Evaluate a check under the UI risk threshold (unless the request
    /// carries its own).
    pub async fn check(&self, request: CheckRequest) -> Decision {
        self.evaluator
            .check(request.with_default_max_risk(self.config.ui_risk_threshold))
            .await
    }

    /// Evaluate a check under the stricter route-guard risk threshold
    /// (unless the request carries its own).
    pub async fn check_route(&self, request: CheckRequest) -> Decision {
        self.evaluator
            .check(request.with_default_max_risk(self.config.route_risk_threshold))
            .await
    }

    /// Pull fresh grants, predictions, and risk profile from the service.
    pub async fn refresh_permissions(&self) -> Result<(), SessionError> {
        self.evaluator.refresh_permissions().await
    }

    /// Snapshot of the granted permissions and per-resource predictions.
    pub fn security_context(&self) -> SecurityContext {
        self.evaluator.security_context()
    }

    // ── Access history ───────────────────────────────────────────────────────

    /// Recorded decisions, most recent first.
    pub fn recent_events(&self) -> Vec<AccessPatternEvent> {
        self.recorder.recent()
    }

    /// Aggregates over the last `window` of recorded decisions.
    pub fn summarize(&self, window: Duration) -> PatternSummary {
        self.recorder.summarize(window)
    }

    /// Anomaly heuristic over the last `window` of recorded decisions.
    pub fn assess(&self, window: Duration) -> PatternAssessment {
        self.recorder.assess(window)
    }

    // ── Teardown ─────────────────────────────────────────────────────────────

    /// Stop the telemetry drain and cancel any pending renewal.
    ///
    /// Idempotent. The engine remains usable for local queries afterwards,
    /// but no more telemetry leaves the process and no renewal fires.
    pub fn shutdown(&self) {
        if let Some(handle) = lock_telemetry(&self.telemetry).take() {
            handle.abort();
            tracing::debug!("telemetry drain stopped");
        }
        self.store.cancel_renewal();
    }
}

impl Drop for AuthEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Holds only the drain task handle; shutdown must survive a poisoning
/// panic elsewhere.
fn lock_telemetry(
    slot: &Mutex<Option<JoinHandle<()>>>,
) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
