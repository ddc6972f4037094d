use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use protecta_core::{CompanyId, LocationId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::RoleId;

/// Unique identifier for a user-role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AssignmentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Binds a user to a role within an optional tenant scope and time window.
///
/// Assignments are never hard-deleted; revocation flips `is_active` so the
/// compliance audit trail stays intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    /// Stable assignment identifier.
    pub id: AssignmentId,
    /// Assigned user.
    pub user_id: UserId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Tenant scope; None means the assignment is global.
    pub company_id: Option<CompanyId>,
    /// Finer location scope under the tenant.
    pub location_id: Option<LocationId>,
    /// Administrator who granted the role.
    pub granted_by: UserId,
    /// Grant timestamp.
    pub granted_at: DateTime<Utc>,
    /// Expiry; None means the assignment never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Soft activation flag.
    pub is_active: bool,
}

impl UserRoleAssignment {
    /// Validity predicate used by all resolution logic.
    ///
    /// An assignment contributes to permission resolution only while it is
    /// active, its role is active, and its expiry (if any) lies in the
    /// future. A failing assignment grants nothing, super-admin included.
    #[must_use]
    pub fn is_valid_at(&self, role_is_active: bool, now: DateTime<Utc>) -> bool {
        if !self.is_active || !role_is_active {
            return false;
        }

        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }

    /// Returns whether the assignment is in scope for the given tenant.
    ///
    /// Global assignments (no company) apply under every tenant; scoped
    /// assignments apply only under their own tenant. With no tenant filter
    /// every assignment is in scope.
    #[must_use]
    pub fn applies_to_tenant(&self, tenant: Option<CompanyId>) -> bool {
        match (self.company_id, tenant) {
            (None, _) | (_, None) => true,
            (Some(company_id), Some(tenant_id)) => company_id == tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use protecta_core::{CompanyId, UserId};

    use crate::role::RoleId;

    use super::{AssignmentId, UserRoleAssignment};

    fn assignment() -> UserRoleAssignment {
        UserRoleAssignment {
            id: AssignmentId::new(),
            user_id: UserId::new(),
            role_id: RoleId::new(),
            company_id: None,
            location_id: None,
            granted_by: UserId::new(),
            granted_at: Utc::now(),
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn active_unexpired_assignment_is_valid() {
        assert!(assignment().is_valid_at(true, Utc::now()));
    }

    #[test]
    fn expired_assignment_is_invalid_even_if_active() {
        let mut expired = assignment();
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(!expired.is_valid_at(true, Utc::now()));
    }

    #[test]
    fn inactive_assignment_is_invalid_even_if_unexpired() {
        let mut revoked = assignment();
        revoked.is_active = false;
        revoked.expires_at = Some(Utc::now() + Duration::days(30));
        assert!(!revoked.is_valid_at(true, Utc::now()));
    }

    #[test]
    fn assignment_of_inactive_role_is_invalid() {
        assert!(!assignment().is_valid_at(false, Utc::now()));
    }

    #[test]
    fn global_assignment_applies_to_any_tenant() {
        assert!(assignment().applies_to_tenant(Some(CompanyId::new())));
    }

    #[test]
    fn scoped_assignment_applies_only_to_its_tenant() {
        let tenant = CompanyId::new();
        let mut scoped = assignment();
        scoped.company_id = Some(tenant);
        assert!(scoped.applies_to_tenant(Some(tenant)));
        assert!(!scoped.applies_to_tenant(Some(CompanyId::new())));
    }
}
