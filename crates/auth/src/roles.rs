use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A role assignment as carried in the token claims.
///
/// Role names are intentionally opaque strings at this layer; what a role
/// unlocks is the policy layer's concern. Inactive assignments are kept
/// for display but are inert for every authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub category: String,
    pub is_active: bool,
    pub assigned_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            is_active: true,
            assigned_at: Utc::now(),
        }
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_roles_start_active() {
        let role = Role::new("hr_manager", "hr");
        assert!(role.is_active);
        assert_eq!(role.name, "hr_manager");
        assert_eq!(role.category, "hr");
    }

    #[test]
    fn deactivated_clears_the_active_flag_only() {
        let role = Role::new("auditor", "security").deactivated();
        assert!(!role.is_active);
        assert_eq!(role.name, "auditor");
    }

    #[test]
    fn serde_round_trip_preserves_fields() {
        let role = Role::new("analytics_viewer", "analytics");
        let json = serde_json::to_string(&role).unwrap();
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, role);
    }
}
