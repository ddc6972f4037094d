use async_trait::async_trait;
use chrono::{DateTime, Utc};
use protecta_core::{AppResult, CompanyId, LocationId, UserId};
use protecta_domain::{Role, RoleId, UserRoleAssignment};

/// Input payload for assigning a role to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignRoleInput {
    /// User receiving the role.
    pub user_id: UserId,
    /// Role to assign.
    pub role_id: RoleId,
    /// Tenant scope; None means the assignment is global.
    pub company_id: Option<CompanyId>,
    /// Finer location scope under the tenant.
    pub location_id: Option<LocationId>,
    /// Expiry; None means the assignment never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

/// One currently valid assignment joined with its role definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidAssignment {
    /// The assignment row.
    pub assignment: UserRoleAssignment,
    /// The role the assignment binds.
    pub role: Role,
}

/// Repository port for user-role assignments.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Persists a new assignment.
    ///
    /// Fails with `DuplicateAssignment` when an active assignment for the
    /// same (user, role, company) triple exists. The uniqueness must be
    /// backed by a storage-level constraint; an application-level check
    /// alone races between concurrent assignment requests.
    async fn insert_assignment(&self, assignment: UserRoleAssignment) -> AppResult<()>;

    /// Soft-deactivates the assignment for a (user, role, company) triple.
    ///
    /// Idempotent: revoking an already-inactive assignment is a no-op.
    async fn revoke_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
        company_id: Option<CompanyId>,
    ) -> AppResult<()>;

    /// Lists assignments satisfying the validity predicate for a user,
    /// joined with their roles.
    ///
    /// With a tenant filter, returns assignments scoped to that tenant
    /// plus global (company-less) assignments.
    async fn list_valid_assignments(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ValidAssignment>>;

    /// Lists active assignments of a user, newest first.
    async fn list_user_assignments(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>>;

    /// Lists active assignments holding a role, newest first.
    async fn list_role_assignees(
        &self,
        role_id: RoleId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>>;
}
