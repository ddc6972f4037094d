use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use protecta_application::{
    AssignmentStore, AuditEvent, AuditRepository, CompanyDirectory, LegacyMembershipStore,
    PermissionStore, RoleStore, ValidAssignment,
};
use protecta_core::{AppError, AppResult, CompanyId, UserId};
use protecta_domain::{
    CountryCode, LegacyMembership, Permission, PermissionId, Role, RoleId, RoleKey,
    UserRoleAssignment,
};

/// In-memory implementation of every access storage port.
///
/// Backs embedded deployments and integration tests without PostgreSQL.
/// Uniqueness rules mirror the database constraints.
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    roles: RwLock<Vec<Role>>,
    permissions: RwLock<Vec<Permission>>,
    assignments: RwLock<Vec<UserRoleAssignment>>,
    legacy_memberships: RwLock<Vec<LegacyMembership>>,
    companies: RwLock<HashMap<CompanyId, Option<CountryCode>>>,
    audit_events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAccessStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a company with an optional country.
    pub async fn add_company(&self, company_id: CompanyId, country: Option<CountryCode>) {
        self.companies.write().await.insert(company_id, country);
    }

    /// Appends a pre-migration membership row.
    pub async fn add_legacy_membership(&self, membership: LegacyMembership) {
        self.legacy_memberships.write().await.push(membership);
    }

    /// Returns a snapshot of appended audit events.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit_events.read().await.clone()
    }
}

#[async_trait]
impl RoleStore for InMemoryAccessStore {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        if roles.iter().any(|stored| stored.role_key == role.role_key) {
            return Err(AppError::DuplicateRoleKey(format!(
                "role key '{}' already exists",
                role.role_key
            )));
        }

        roles.push(role);
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        match roles.iter_mut().find(|stored| stored.id == role.id) {
            Some(stored) => {
                *stored = role.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("role '{}'", role.id))),
        }
    }

    async fn get_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.roles
            .read()
            .await
            .iter()
            .find(|stored| stored.id == role_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))
    }

    async fn get_role_by_key(&self, role_key: &RoleKey) -> AppResult<Role> {
        self.roles
            .read()
            .await
            .iter()
            .find(|stored| &stored.role_key == role_key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_key}'")))
    }

    async fn list_roles(&self, country_filter: Option<&CountryCode>) -> AppResult<Vec<Role>> {
        let mut roles: Vec<Role> = self
            .roles
            .read()
            .await
            .iter()
            .filter(|role| match country_filter {
                None => true,
                Some(country) => role.applies_to_country(country),
            })
            .cloned()
            .collect();
        roles.sort_by(|left, right| left.role_key.as_str().cmp(right.role_key.as_str()));

        Ok(roles)
    }
}

#[async_trait]
impl PermissionStore for InMemoryAccessStore {
    async fn list_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .iter()
            .filter(|permission| permission.role_id == role_id && permission.is_active)
            .cloned()
            .collect())
    }

    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .iter()
            .filter(|permission| permission.is_active && role_ids.contains(&permission.role_id))
            .cloned()
            .collect())
    }

    async fn get_permission(&self, permission_id: PermissionId) -> AppResult<Permission> {
        self.permissions
            .read()
            .await
            .iter()
            .find(|permission| permission.id == permission_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("permission '{permission_id}'")))
    }

    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;

        let collides = permissions.iter().any(|stored| {
            stored.is_active
                && stored.role_id == permission.role_id
                && stored.resource == permission.resource
                && stored.action == permission.action
                && stored.country_code == permission.country_code
        });
        if collides {
            return Err(AppError::DuplicatePermission(format!(
                "active grant ({}, {}) already exists for role '{}'",
                permission.resource.as_str(),
                permission.action.as_str(),
                permission.role_id
            )));
        }

        permissions.push(permission);
        Ok(())
    }

    async fn update_permission(&self, permission: &Permission) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;

        match permissions
            .iter_mut()
            .find(|stored| stored.id == permission.id)
        {
            Some(stored) => {
                *stored = permission.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "permission '{}'",
                permission.id
            ))),
        }
    }

    async fn deactivate_permission(&self, permission_id: PermissionId) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;

        match permissions
            .iter_mut()
            .find(|stored| stored.id == permission_id)
        {
            Some(stored) => {
                stored.is_active = false;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("permission '{permission_id}'"))),
        }
    }

    async fn replace_all_permissions(
        &self,
        role_id: RoleId,
        new_set: Vec<Permission>,
    ) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;

        for stored in permissions.iter_mut() {
            if stored.role_id == role_id {
                stored.is_active = false;
            }
        }
        permissions.extend(new_set);

        Ok(())
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAccessStore {
    async fn insert_assignment(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;

        let collides = assignments.iter().any(|stored| {
            stored.is_active
                && stored.user_id == assignment.user_id
                && stored.role_id == assignment.role_id
                && stored.company_id == assignment.company_id
        });
        if collides {
            return Err(AppError::DuplicateAssignment(format!(
                "user '{}' already holds role '{}' in this scope",
                assignment.user_id, assignment.role_id
            )));
        }

        assignments.push(assignment);
        Ok(())
    }

    async fn revoke_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
        company_id: Option<CompanyId>,
    ) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;

        for stored in assignments.iter_mut() {
            if stored.user_id == user_id
                && stored.role_id == role_id
                && stored.company_id == company_id
            {
                stored.is_active = false;
            }
        }

        Ok(())
    }

    async fn list_valid_assignments(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ValidAssignment>> {
        let assignments = self.assignments.read().await;
        let roles = self.roles.read().await;

        Ok(assignments
            .iter()
            .filter(|assignment| {
                assignment.user_id == user_id && assignment.applies_to_tenant(tenant)
            })
            .filter_map(|assignment| {
                let role = roles.iter().find(|role| role.id == assignment.role_id)?;
                assignment
                    .is_valid_at(role.is_active, now)
                    .then(|| ValidAssignment {
                        assignment: assignment.clone(),
                        role: role.clone(),
                    })
            })
            .collect())
    }

    async fn list_user_assignments(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        let mut assignments: Vec<UserRoleAssignment> = self
            .assignments
            .read()
            .await
            .iter()
            .filter(|assignment| {
                assignment.is_active
                    && assignment.user_id == user_id
                    && assignment.applies_to_tenant(tenant)
            })
            .cloned()
            .collect();
        assignments.sort_by(|left, right| right.granted_at.cmp(&left.granted_at));

        Ok(assignments)
    }

    async fn list_role_assignees(
        &self,
        role_id: RoleId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        let mut assignments: Vec<UserRoleAssignment> = self
            .assignments
            .read()
            .await
            .iter()
            .filter(|assignment| {
                assignment.is_active
                    && assignment.role_id == role_id
                    && assignment.applies_to_tenant(tenant)
            })
            .cloned()
            .collect();
        assignments.sort_by(|left, right| right.granted_at.cmp(&left.granted_at));

        Ok(assignments)
    }
}

#[async_trait]
impl LegacyMembershipStore for InMemoryAccessStore {
    async fn list_active_memberships(
        &self,
        user_id: UserId,
        organization_id: Option<CompanyId>,
    ) -> AppResult<Vec<LegacyMembership>> {
        Ok(self
            .legacy_memberships
            .read()
            .await
            .iter()
            .filter(|membership| {
                membership.is_active
                    && membership.user_id == user_id
                    && organization_id
                        .is_none_or(|organization_id| membership.organization_id == organization_id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CompanyDirectory for InMemoryAccessStore {
    async fn find_country(&self, company_id: CompanyId) -> AppResult<Option<CountryCode>> {
        Ok(self
            .companies
            .read()
            .await
            .get(&company_id)
            .cloned()
            .flatten())
    }
}

#[async_trait]
impl AuditRepository for InMemoryAccessStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.audit_events.write().await.push(event);
        Ok(())
    }
}
