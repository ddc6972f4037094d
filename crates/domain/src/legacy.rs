use protecta_core::{AppError, AppResult, CompanyId, UserId};
use serde::{Deserialize, Serialize};

use crate::role::RoleKey;

/// Pre-migration membership record: one free-form role string per
/// organization membership. Read-only from this core's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMembership {
    /// Member user.
    pub user_id: UserId,
    /// Organization the membership belongs to.
    pub organization_id: CompanyId,
    /// Free-form legacy role string.
    pub role: String,
    /// Active flag on the legacy row.
    pub is_active: bool,
}

/// Legacy role string to current role key, one entry per known value.
static LEGACY_ROLE_MAP: &[(&str, &str)] = &[
    ("super_admin", "super_admin"),
    ("consultant", "consultant_ssm"),
    ("admin", "company_admin"),
    ("hr", "hr_manager"),
    ("employee", "angajat"),
];

/// Maps a legacy role string to its current role key.
///
/// An unmapped string is a hard error rather than a silent drop: dropping
/// it would under-grant without any diagnosis of the stale data.
pub fn map_legacy_role(value: &str) -> AppResult<RoleKey> {
    let normalized = value.trim().to_lowercase();

    let mapped = LEGACY_ROLE_MAP
        .iter()
        .find(|(legacy, _)| *legacy == normalized)
        .map(|(_, key)| *key)
        .ok_or_else(|| AppError::UnmappedLegacyRole(format!("legacy role '{value}'")))?;

    RoleKey::new(mapped)
}

#[cfg(test)]
mod tests {
    use protecta_core::AppError;

    use super::map_legacy_role;

    #[test]
    fn consultant_maps_to_consultant_ssm() {
        let key = map_legacy_role("consultant");
        assert!(key.is_ok());
        assert_eq!(
            key.unwrap_or_else(|_| panic!("test")).as_str(),
            "consultant_ssm"
        );
    }

    #[test]
    fn mapping_normalizes_case_and_whitespace() {
        let key = map_legacy_role("  Admin ");
        assert!(key.is_ok_and(|key| key.as_str() == "company_admin"));
    }

    #[test]
    fn unknown_legacy_role_is_a_hard_error() {
        let result = map_legacy_role("intern");
        assert!(matches!(result, Err(AppError::UnmappedLegacyRole(_))));
    }
}
