//! Engine error model.

use thiserror::Error;

use parapet_auth::DecodeError;
use parapet_client::ApiError;

/// Failures surfaced by the session lifecycle operations.
///
/// Authorization *decisions* are never errors: a denied check is a value
/// (see [`Decision`](crate::Decision)). This enum covers the session
/// plumbing around those decisions, where the caller genuinely needs to
/// know that something did not happen.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    /// An operation that needs an active session ran without one.
    #[error("no active session")]
    NotAuthenticated,

    /// The persisted token is past expiry and could not be refreshed.
    #[error("session token expired")]
    Expired,

    /// A refresh was required but no refresh credential is persisted.
    #[error("no refresh credential available")]
    NoRefreshCredential,

    /// The access token failed structural decoding.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A remote call to the authorization service failed.
    #[error("authorization service call failed: {0}")]
    Api(#[from] ApiError),

    /// The credential store misbehaved in a way initialization could not
    /// degrade around.
    #[error("credential store failure: {0}")]
    Store(String),
}
