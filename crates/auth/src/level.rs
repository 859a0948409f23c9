use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Ordinal permission tier carried in the token claims.
///
/// Levels are opaque strings on the wire; the total order lives entirely
/// in [`PermissionLevel::rank`]. A string outside the known table ranks 0
/// and loses every comparison, so a misspelt level in a token or a guard
/// configuration denies instead of granting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionLevel(Cow<'static, str>);

impl PermissionLevel {
    pub const STANDARD: PermissionLevel = PermissionLevel(Cow::Borrowed("standard"));
    pub const MANAGEMENT: PermissionLevel = PermissionLevel(Cow::Borrowed("management"));
    pub const AI_SPECIALIST: PermissionLevel = PermissionLevel(Cow::Borrowed("ai_specialist"));
    pub const EXECUTIVE_HIGH: PermissionLevel = PermissionLevel(Cow::Borrowed("executive_high"));
    pub const EXECUTIVE_MAX: PermissionLevel = PermissionLevel(Cow::Borrowed("executive_max"));
    pub const SUPERUSER: PermissionLevel = PermissionLevel(Cow::Borrowed("superuser"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position in the fixed level order; 0 for anything unrecognized.
    pub fn rank(&self) -> u8 {
        match self.0.as_ref() {
            "standard" => 1,
            "management" => 2,
            "ai_specialist" => 3,
            "executive_high" => 4,
            "executive_max" => 5,
            "superuser" => 6,
            _ => 0,
        }
    }

    /// Whether this level satisfies `required`.
    ///
    /// False whenever either side is unrecognized: an unknown holder level
    /// cannot satisfy anything, and an unknown requirement cannot be
    /// satisfied.
    pub fn meets(&self, required: &PermissionLevel) -> bool {
        let needed = required.rank();
        needed != 0 && self.rank() >= needed
    }
}

impl core::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
