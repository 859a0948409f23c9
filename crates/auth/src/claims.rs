use serde::{Deserialize, Serialize};

use parapet_core::UserId;
use parapet_risk::RiskProfile;

use crate::{PermissionLevel, Role};

/// Identity and authorization attributes of a decoded session token.
///
/// Claims are immutable once decoded; a refreshed token produces a fresh
/// value. Everything a local authorization check needs is answered from
/// here without IO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub username: String,
    pub email: String,

    /// Every role assignment, active or not.
    pub roles: Vec<Role>,

    /// Ordinal tier for coarse-grained checks.
    pub permission_level: PermissionLevel,

    pub is_staff: bool,
    pub is_superuser: bool,

    /// Server-computed behavioural risk, replaced wholesale on refresh.
    pub risk_profile: RiskProfile,
}

/// Broad account kinds a guard can require (ANY-of).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    Staff,
    Superuser,
}

impl Claims {
    /// Active-role membership; names match case-sensitively and exactly.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.is_active && role.name == name)
    }

    /// True if any of `names` is an active role.
    pub fn has_any_role<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| self.has_role(name.as_ref()))
    }

    /// Ordinal level comparison; see [`PermissionLevel::meets`].
    pub fn meets_level(&self, required: &PermissionLevel) -> bool {
        self.permission_level.meets(required)
    }

    pub fn is_kind(&self, kind: UserKind) -> bool {
        match kind {
            UserKind::Staff => self.is_staff,
            UserKind::Superuser => self.is_superuser,
        }
    }

    /// True if the account matches any of `kinds`.
    pub fn is_any_kind(&self, kinds: &[UserKind]) -> bool {
        kinds.iter().any(|kind| self.is_kind(*kind))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
