//! Session data and the lifecycle state machine.

use chrono::{DateTime, Duration, Utc};
use parapet_auth::{Claims, DecodedToken};

/// An authenticated session: the raw bearer token plus its decoded contents.
///
/// The raw token is kept verbatim so outgoing requests can attach exactly what
/// the service issued. Claims are read-only once decoded; only the risk
/// profile is replaced wholesale when the service sends a fresh one.
#[derive(Debug, Clone)]
pub struct Session {
    raw_token: String,
    pub claims: Claims,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_decoded(raw_token: impl Into<String>, decoded: DecodedToken) -> Self {
        Self {
            raw_token: raw_token.into(),
            claims: decoded.claims,
            issued_at: decoded.issued_at,
            expires_at: decoded.expires_at,
        }
    }

    /// The bearer token as issued, for the `Authorization` header.
    pub fn raw_token(&self) -> &str {
        &self.raw_token
    }

    /// When the proactive renewal should fire: `lead` before expiry.
    ///
    /// For very short-lived tokens this can be in the past, in which case the
    /// renewal fires immediately.
    pub fn renewal_deadline(&self, lead: Duration) -> DateTime<Utc> {
        self.expires_at - lead
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Lifecycle states of the session store.
///
/// Transitions are driven exclusively by [`SessionStore`](crate::SessionStore):
///
/// ```text
/// Uninitialized -> Loading -> Authenticated | Anonymous
/// Authenticated -> Refreshing -> Authenticated | LoggedOut
/// Authenticated | Refreshing -> Anonymous        (logout)
/// ```
///
/// `Refreshing` still carries the previous session so permission checks keep
/// working while the token exchange is in flight.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// `initialize` has not been called yet.
    #[default]
    Uninitialized,
    /// Persisted credentials are being loaded and validated.
    Loading,
    /// A valid session is active.
    Authenticated(Session),
    /// A token refresh is in flight; the previous session is still usable.
    Refreshing(Session),
    /// No credentials were found, or the user logged out.
    Anonymous,
    /// A refresh failed and the credentials were discarded.
    LoggedOut,
}

impl SessionState {
    /// The active session, if any. `Refreshing` counts: its previous token is
    /// still the one in use until the exchange completes.
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) | SessionState::Refreshing(session) => {
                Some(session)
            }
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Short name for logging.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Loading => "loading",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Refreshing(_) => "refreshing",
            SessionState::Anonymous => "anonymous",
            SessionState::LoggedOut => "logged_out",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
