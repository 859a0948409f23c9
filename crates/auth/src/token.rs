use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use parapet_core::UserId;
use parapet_risk::RiskProfile;

use crate::{Claims, PermissionLevel, Role};

/// Structural decode failures.
///
/// Both variants are fatal to the session that presented the token; there
/// is no partial decode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed token")]
    Malformed,

    #[error("token payload is missing required claim '{0}'")]
    MissingClaim(&'static str),
}

/// Time-window violations, checked separately from structure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// A structurally valid session token.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub claims: Claims,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Payload shape as found on the wire. All fields optional so absence can
/// be reported per-claim instead of as one opaque serde error; anything
/// the shape does not name is rejected outright.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPayload {
    user_id: Option<UserId>,
    username: Option<String>,
    email: Option<String>,
    roles: Option<Vec<Role>>,
    permission_level: Option<PermissionLevel>,
    is_staff: Option<bool>,
    is_superuser: Option<bool>,
    risk_profile: Option<RiskProfile>,
    iat: Option<i64>,
    exp: Option<i64>,
}

/// Decodes a compact session token into typed claims.
///
/// The token must have exactly three non-empty dot-separated segments; the
/// middle segment is base64url JSON. The signature segment must be present
/// but is **not** verified here: integrity is the issuer's and the
/// transport's concern, and this side holds no verification key.
///
/// Structural violations map to [`DecodeError::Malformed`]; a payload that
/// parses as JSON but lacks a required claim (or carries `null` for one)
/// maps to [`DecodeError::MissingClaim`]. Never panics.
pub fn decode(token: &str) -> Result<DecodedToken, DecodeError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Malformed);
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(DecodeError::Malformed);
    }

    let bytes = decode_segment(payload)?;
    let raw: RawPayload = serde_json::from_slice(&bytes).map_err(|_| DecodeError::Malformed)?;

    let issued_at = timestamp(require(raw.iat, "iat")?)?;
    let expires_at = timestamp(require(raw.exp, "exp")?)?;

    Ok(DecodedToken {
        claims: Claims {
            user_id: require(raw.user_id, "user_id")?,
            username: require(raw.username, "username")?,
            email: require(raw.email, "email")?,
            roles: require(raw.roles, "roles")?,
            permission_level: require(raw.permission_level, "permission_level")?,
            is_staff: require(raw.is_staff, "is_staff")?,
            is_superuser: require(raw.is_superuser, "is_superuser")?,
            risk_profile: require(raw.risk_profile, "risk_profile")?,
        },
        issued_at,
        expires_at,
    })
}

/// Deterministically validate a decoded token's time window.
///
/// Kept apart from [`decode`] so callers can distinguish "garbage token"
/// from "good token, wrong time" and react differently (the session store
/// refreshes the latter).
pub fn validate_token(
    token: &DecodedToken,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if token.expires_at <= token.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < token.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= token.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, DecodeError> {
    // Issuers differ on padding; strip any and decode with the unpadded
    // url-safe alphabet.
    let trimmed = segment.trim_end_matches('=');
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed.as_bytes())
        .map_err(|_| DecodeError::Malformed)
}

fn require<T>(value: Option<T>, claim: &'static str) -> Result<T, DecodeError> {
    value.ok_or(DecodeError::MissingClaim(claim))
}

fn timestamp(unix_seconds: i64) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::from_timestamp(unix_seconds, 0).ok_or(DecodeError::Malformed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
