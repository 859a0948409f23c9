//! Session store: persisted credentials, reactive state, proactive renewal.
//!
//! All session mutation goes through this type. State is published on a
//! `watch` channel so UI collaborators can react to transitions without
//! polling, and the store owns the single renewal timer: arming happens
//! only when a session is installed, and every transition away from
//! `Authenticated` cancels whatever timer is pending, so no two timers can
//! coexist.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use parapet_auth::{Claims, decode, validate_token};
use parapet_client::{AuthApi, CredentialStore, StoredCredentials};
use parapet_risk::RiskProfile;

use crate::config::EngineConfig;
use crate::error::SessionError;
use crate::session::{Session, SessionState};

pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    credentials: Arc<dyn CredentialStore>,
    config: EngineConfig,
    state_tx: watch::Sender<SessionState>,
    renewal: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    pub fn new(
        api: Arc<dyn AuthApi>,
        credentials: Arc<dyn CredentialStore>,
        config: EngineConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Uninitialized);
        Self {
            api,
            credentials,
            config,
            state_tx,
            renewal: Mutex::new(None),
        }
    }

    // ── Reactive state ───────────────────────────────────────────────────────

    /// Receiver for session state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state_tx.borrow().is_authenticated()
    }

    /// Claims of the active session, if any.
    pub fn claims(&self) -> Option<Claims> {
        self.state_tx.borrow().session().map(|s| s.claims.clone())
    }

    /// The bearer token outgoing requests should carry.
    pub fn raw_token(&self) -> Option<String> {
        self.state_tx
            .borrow()
            .session()
            .map(|s| s.raw_token().to_string())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state_tx.borrow().session().map(|s| s.expires_at)
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Restore the session persisted by a previous run.
    ///
    /// No token → `Anonymous`. A token outside its validity window (or one
    /// that no longer decodes) is exchanged through one immediate
    /// [`refresh`](Self::refresh) when a refresh credential exists;
    /// otherwise the credentials are discarded and the store ends up
    /// `LoggedOut`. A live token transitions straight to `Authenticated`
    /// and arms the renewal timer.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), SessionError> {
        self.set_state(SessionState::Loading);

        let stored = match self.credentials.load().await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!("failed to load persisted credentials, starting anonymous: {err:#}");
                self.set_state(SessionState::Anonymous);
                return Ok(());
            }
        };

        let Some(raw) = stored.access_token else {
            tracing::debug!("no persisted access token");
            self.set_state(SessionState::Anonymous);
            return Ok(());
        };

        let decoded = match decode(&raw) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!("persisted token no longer decodes: {err}");
                if stored.refresh_token.is_some() {
                    return self.refresh().await;
                }
                self.clear_credentials().await;
                self.set_state(SessionState::LoggedOut);
                return Err(SessionError::Decode(err));
            }
        };

        match validate_token(&decoded, Utc::now()) {
            Ok(()) => {
                self.install_session(Session::from_decoded(raw, decoded));
                Ok(())
            }
            Err(err) => {
                tracing::info!("persisted token unusable ({err}), attempting refresh");
                if stored.refresh_token.is_some() {
                    self.refresh().await
                } else {
                    self.clear_credentials().await;
                    self.set_state(SessionState::LoggedOut);
                    Err(SessionError::Expired)
                }
            }
        }
    }

    /// Adopt a freshly issued token pair (interactive authentication).
    ///
    /// The access token only has to decode; its validity window is the
    /// issuer's business, and a pathological one simply triggers an
    /// immediate renewal.
    pub async fn login(
        self: &Arc<Self>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Result<(), SessionError> {
        let access_token = access_token.into();
        let decoded = decode(&access_token)?;

        let pair = StoredCredentials::new(Some(access_token.clone()), refresh_token);
        if let Err(err) = self.credentials.store(&pair).await {
            tracing::warn!("failed to persist login credentials: {err:#}");
        }

        let session = Session::from_decoded(access_token, decoded);
        tracing::info!(user = %session.claims.username, "session established");
        self.install_session(session);
        Ok(())
    }

    /// Exchange the persisted refresh credential for a new session.
    ///
    /// On success the session is replaced atomically, both credentials are
    /// persisted, and the renewal timer is re-armed. Any failure discards
    /// the persisted credentials and leaves the store `LoggedOut`.
    pub async fn refresh(self: &Arc<Self>) -> Result<(), SessionError> {
        let stored = match self.credentials.load().await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!("failed to load credentials for refresh: {err:#}");
                StoredCredentials::default()
            }
        };

        let Some(refresh_token) = stored.refresh_token else {
            self.clear_credentials().await;
            self.set_state(SessionState::LoggedOut);
            return Err(SessionError::NoRefreshCredential);
        };

        // Keep serving the previous session while the exchange is in flight.
        if let SessionState::Authenticated(session) = self.state() {
            self.set_state(SessionState::Refreshing(session));
        }

        let response = match self.api.refresh_token(&refresh_token).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("token refresh failed: {err}");
                self.clear_credentials().await;
                self.set_state(SessionState::LoggedOut);
                return Err(SessionError::Api(err));
            }
        };

        let decoded = match decode(&response.access) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::error!("refresh returned an undecodable access token: {err}");
                self.clear_credentials().await;
                self.set_state(SessionState::LoggedOut);
                return Err(SessionError::Decode(err));
            }
        };

        // A logout that raced the exchange wins; do not resurrect the session.
        if matches!(self.state(), SessionState::Anonymous) {
            tracing::info!("logout during refresh, discarding the refreshed session");
            return Err(SessionError::NotAuthenticated);
        }

        let rotated = response.refresh.unwrap_or(refresh_token);
        let pair = StoredCredentials::new(Some(response.access.clone()), Some(rotated));
        if let Err(err) = self.credentials.store(&pair).await {
            tracing::warn!("failed to persist refreshed credentials: {err:#}");
        }

        tracing::info!("session refreshed");
        self.install_session(Session::from_decoded(response.access, decoded));
        Ok(())
    }

    /// Best-effort server notification, then unconditional local teardown.
    ///
    /// The `/logout` call is attempted once and its failure only logged;
    /// local state and persisted credentials are cleared regardless.
    pub async fn logout(&self) {
        // Cancel up front so a renewal cannot fire mid-teardown.
        self.cancel_renewal();

        let token = self.raw_token();
        let stored = self.credentials.load().await.unwrap_or_default();

        if let (Some(token), Some(refresh)) = (token, stored.refresh_token) {
            if let Err(err) = self.api.logout(&token, &refresh).await {
                tracing::debug!("best-effort logout notification failed: {err}");
            }
        }

        self.clear_credentials().await;
        self.set_state(SessionState::Anonymous);
        tracing::info!("session cleared");
    }

    /// Replace the active session's risk profile wholesale.
    ///
    /// No-op outside `Authenticated`/`Refreshing`; the profile arrives
    /// with permission refreshes, which require a session anyway.
    pub fn replace_risk_profile(&self, profile: RiskProfile) {
        self.state_tx.send_if_modified(|state| match state {
            SessionState::Authenticated(session) | SessionState::Refreshing(session) => {
                session.claims.risk_profile = profile;
                true
            }
            _ => false,
        });
    }

    // ── Transitions and the renewal timer ────────────────────────────────────

    /// Transition to a state that must not keep a renewal pending.
    fn set_state(&self, state: SessionState) {
        self.cancel_renewal();
        tracing::debug!(state = state.label(), "session state change");
        self.state_tx.send_replace(state);
    }

    /// Publish an authenticated session and arm its renewal timer.
    fn install_session(self: &Arc<Self>, session: Session) {
        let deadline = session.renewal_deadline(self.config.renewal_lead);
        self.set_state(SessionState::Authenticated(session));
        self.arm_renewal(deadline);
    }

    fn arm_renewal(self: &Arc<Self>, deadline: DateTime<Utc>) {
        let wait = (deadline - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        tracing::debug!(?wait, "renewal timer armed");

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let Some(store) = weak.upgrade() else { return };

            // Detach first so the Refreshing transition inside refresh()
            // does not abort this very task; then re-check that the session
            // is still the one the timer was armed for.
            drop(lock_renewal(&store.renewal).take());
            if !matches!(store.state(), SessionState::Authenticated(_)) {
                return;
            }

            tracing::info!("renewal timer fired");
            if let Err(err) = store.refresh().await {
                tracing::warn!("scheduled refresh failed: {err}");
            }
        });

        *lock_renewal(&self.renewal) = Some(handle);
    }

    pub(crate) fn cancel_renewal(&self) {
        if let Some(handle) = lock_renewal(&self.renewal).take() {
            handle.abort();
        }
    }

    async fn clear_credentials(&self) {
        if let Err(err) = self.credentials.clear().await {
            tracing::warn!("failed to clear persisted credentials: {err:#}");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.cancel_renewal();
    }
}

/// The slot only holds a task handle; a poisoning panic elsewhere must not
/// wedge cancellation.
fn lock_renewal(slot: &Mutex<Option<JoinHandle<()>>>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
