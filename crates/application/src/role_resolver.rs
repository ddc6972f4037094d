use std::sync::Arc;

use chrono::{DateTime, Utc};
use protecta_core::{AppError, AppResult, CompanyId, LocationId, UserId};
use protecta_domain::{RoleId, RoleKey, map_legacy_role};

use crate::access_ports::{AssignmentStore, LegacyMembershipStore, ValidAssignment};

/// One currently valid role held by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRole {
    /// Role identifier; None when synthesized from a legacy membership,
    /// which carries no current-schema role row.
    pub role_id: Option<RoleId>,
    /// Stable role key.
    pub role_key: RoleKey,
    /// Display label.
    pub role_name: String,
    /// Tenant scope of the underlying assignment.
    pub company_id: Option<CompanyId>,
    /// Location scope of the underlying assignment.
    pub location_id: Option<LocationId>,
    /// Expiry of the underlying assignment.
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResolvedRole {
    fn from_valid(valid: ValidAssignment) -> Self {
        Self {
            role_id: Some(valid.role.id),
            role_key: valid.role.role_key,
            role_name: valid.role.role_name,
            company_id: valid.assignment.company_id,
            location_id: valid.assignment.location_id,
            expires_at: valid.assignment.expires_at,
        }
    }

    /// Returns whether this resolved role is the platform super-admin.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role_key.is_super_admin()
    }
}

/// Resolves the set of currently valid role assignments for a user.
#[derive(Clone)]
pub struct RoleResolver {
    assignments: Arc<dyn AssignmentStore>,
    legacy_memberships: Arc<dyn LegacyMembershipStore>,
}

impl RoleResolver {
    /// Creates a resolver from the assignment store and legacy fallback.
    #[must_use]
    pub fn new(
        assignments: Arc<dyn AssignmentStore>,
        legacy_memberships: Arc<dyn LegacyMembershipStore>,
    ) -> Self {
        Self {
            assignments,
            legacy_memberships,
        }
    }

    /// Returns the user's valid roles, optionally narrowed to one tenant.
    ///
    /// The legacy membership table is consulted only when the current
    /// schema query *errors*; a successful empty result is a legitimate
    /// "no permissions" answer and never triggers the fallback.
    pub async fn resolve_roles(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<ResolvedRole>> {
        match self
            .assignments
            .list_valid_assignments(user_id, tenant, Utc::now())
            .await
        {
            Ok(rows) => Ok(rows.into_iter().map(ResolvedRole::from_valid).collect()),
            Err(error) => {
                tracing::warn!(
                    %user_id,
                    %error,
                    "assignment query failed, falling back to legacy memberships"
                );
                self.resolve_from_legacy(user_id, tenant).await
            }
        }
    }

    async fn resolve_from_legacy(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<ResolvedRole>> {
        let memberships = self
            .legacy_memberships
            .list_active_memberships(user_id, tenant)
            .await?;

        memberships
            .into_iter()
            .map(|membership| {
                let role_key = map_legacy_role(membership.role.as_str())?;
                Ok(ResolvedRole {
                    role_id: None,
                    role_name: role_key.as_str().to_owned(),
                    role_key,
                    company_id: Some(membership.organization_id),
                    location_id: None,
                    expires_at: None,
                })
            })
            .collect()
    }
}

/// Converts an evaluation-path resolution failure into the safe default.
///
/// Storage failures must deny rather than leak an error a caller could
/// misread as "allowed". `UnmappedLegacyRole` is the one exception: masking
/// it would turn stale migration data into a silent under-grant.
pub(crate) fn fail_closed<T: Default>(error: AppError, check: &'static str) -> AppResult<T> {
    if matches!(error, AppError::UnmappedLegacyRole(_)) {
        return Err(error);
    }

    tracing::warn!(%error, check, "resolution failed, answering with the safe default");
    Ok(T::default())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use protecta_core::{AppError, AppResult, CompanyId, UserId};
    use protecta_domain::{
        AssignmentId, LegacyMembership, Role, RoleId, RoleKey, UserRoleAssignment,
    };

    use crate::access_ports::{AssignmentStore, LegacyMembershipStore, ValidAssignment};

    use super::RoleResolver;

    struct FakeAssignmentStore {
        result: AppResult<Vec<ValidAssignment>>,
    }

    #[async_trait]
    impl AssignmentStore for FakeAssignmentStore {
        async fn insert_assignment(&self, _assignment: UserRoleAssignment) -> AppResult<()> {
            Ok(())
        }

        async fn revoke_assignment(
            &self,
            _user_id: UserId,
            _role_id: RoleId,
            _company_id: Option<CompanyId>,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn list_valid_assignments(
            &self,
            _user_id: UserId,
            _tenant: Option<CompanyId>,
            _now: DateTime<Utc>,
        ) -> AppResult<Vec<ValidAssignment>> {
            match &self.result {
                Ok(rows) => Ok(rows.clone()),
                Err(AppError::StorageUnavailable(message)) => {
                    Err(AppError::StorageUnavailable(message.clone()))
                }
                Err(_) => Err(AppError::Internal("fake".to_owned())),
            }
        }

        async fn list_user_assignments(
            &self,
            _user_id: UserId,
            _tenant: Option<CompanyId>,
        ) -> AppResult<Vec<UserRoleAssignment>> {
            Ok(Vec::new())
        }

        async fn list_role_assignees(
            &self,
            _role_id: RoleId,
            _tenant: Option<CompanyId>,
        ) -> AppResult<Vec<UserRoleAssignment>> {
            Ok(Vec::new())
        }
    }

    struct FakeLegacyStore {
        memberships: Vec<LegacyMembership>,
    }

    #[async_trait]
    impl LegacyMembershipStore for FakeLegacyStore {
        async fn list_active_memberships(
            &self,
            _user_id: UserId,
            _organization_id: Option<CompanyId>,
        ) -> AppResult<Vec<LegacyMembership>> {
            Ok(self.memberships.clone())
        }
    }

    fn role(key: &str) -> Role {
        Role {
            id: RoleId::new(),
            role_key: RoleKey::new(key).unwrap_or_else(|_| panic!("test role key")),
            role_name: key.to_owned(),
            description: None,
            country_code: None,
            is_system: false,
            is_active: true,
            created_by: UserId::new(),
            created_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    fn assignment(user_id: UserId, role_id: RoleId) -> UserRoleAssignment {
        UserRoleAssignment {
            id: AssignmentId::new(),
            user_id,
            role_id,
            company_id: None,
            location_id: None,
            granted_by: UserId::new(),
            granted_at: Utc::now(),
            expires_at: Some(Utc::now() + Duration::days(7)),
            is_active: true,
        }
    }

    fn resolver(
        result: AppResult<Vec<ValidAssignment>>,
        memberships: Vec<LegacyMembership>,
    ) -> RoleResolver {
        RoleResolver::new(
            Arc::new(FakeAssignmentStore { result }),
            Arc::new(FakeLegacyStore { memberships }),
        )
    }

    #[tokio::test]
    async fn valid_assignments_are_projected() {
        let user_id = UserId::new();
        let role = role("consultant_ssm");
        let valid = ValidAssignment {
            assignment: assignment(user_id, role.id),
            role,
        };
        let resolver = resolver(Ok(vec![valid]), Vec::new());

        let roles = resolver.resolve_roles(user_id, None).await;
        assert!(roles.is_ok());
        let roles = roles.unwrap_or_default();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role_key.as_str(), "consultant_ssm");
    }

    #[tokio::test]
    async fn empty_result_does_not_trigger_fallback() {
        let user_id = UserId::new();
        let stale = LegacyMembership {
            user_id,
            organization_id: CompanyId::new(),
            role: "consultant".to_owned(),
            is_active: true,
        };
        let resolver = resolver(Ok(Vec::new()), vec![stale]);

        let roles = resolver.resolve_roles(user_id, None).await;
        assert!(roles.is_ok_and(|roles| roles.is_empty()));
    }

    #[tokio::test]
    async fn query_error_falls_back_to_legacy_memberships() {
        let user_id = UserId::new();
        let organization_id = CompanyId::new();
        let membership = LegacyMembership {
            user_id,
            organization_id,
            role: "consultant".to_owned(),
            is_active: true,
        };
        let resolver = resolver(
            Err(AppError::StorageUnavailable("schema migrating".to_owned())),
            vec![membership],
        );

        let roles = resolver.resolve_roles(user_id, Some(organization_id)).await;
        assert!(roles.is_ok());
        let roles = roles.unwrap_or_default();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role_key.as_str(), "consultant_ssm");
        assert_eq!(roles[0].company_id, Some(organization_id));
        assert!(roles[0].role_id.is_none());
    }

    #[tokio::test]
    async fn unmapped_legacy_role_is_surfaced() {
        let user_id = UserId::new();
        let membership = LegacyMembership {
            user_id,
            organization_id: CompanyId::new(),
            role: "intern".to_owned(),
            is_active: true,
        };
        let resolver = resolver(
            Err(AppError::StorageUnavailable("schema migrating".to_owned())),
            vec![membership],
        );

        let result = resolver.resolve_roles(user_id, None).await;
        assert!(matches!(result, Err(AppError::UnmappedLegacyRole(_))));
    }
}
