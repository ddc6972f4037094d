use std::collections::BTreeMap;

use async_trait::async_trait;
use protecta_core::AppResult;
use protecta_domain::{Action, CountryCode, FieldVisibility, Permission, PermissionId, Resource, RoleId};

/// Input payload for a single permission grant.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionGrantInput {
    /// Protected resource kind.
    pub resource: Resource,
    /// Granted action.
    pub action: Action,
    /// Per-field visibility overrides.
    pub field_restrictions: BTreeMap<String, FieldVisibility>,
    /// Opaque predicate bag reserved for attribute-based rules.
    pub conditions: serde_json::Value,
    /// Country scope; None means global.
    pub country_code: Option<CountryCode>,
}

/// Partial update for a permission grant; None fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePermissionInput {
    /// New field visibility overrides.
    pub field_restrictions: Option<BTreeMap<String, FieldVisibility>>,
    /// New conditions bag.
    pub conditions: Option<serde_json::Value>,
    /// New country scope.
    pub country_code: Option<CountryCode>,
}

/// Repository port for permission grants.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Lists the active permission set of one role.
    async fn list_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>>;

    /// Lists active permissions across a set of roles.
    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>>;

    /// Loads a permission grant by identifier.
    async fn get_permission(&self, permission_id: PermissionId) -> AppResult<Permission>;

    /// Persists a new permission grant.
    ///
    /// Fails with `DuplicatePermission` when an active grant for the same
    /// (role, resource, action, country) tuple exists.
    async fn insert_permission(&self, permission: Permission) -> AppResult<()>;

    /// Persists the full updated state of an existing grant.
    async fn update_permission(&self, permission: &Permission) -> AppResult<()>;

    /// Soft-deactivates a permission grant.
    async fn deactivate_permission(&self, permission_id: PermissionId) -> AppResult<()>;

    /// Replaces the role's active permission set.
    ///
    /// Two-phase: deactivate every current active grant, then insert the
    /// new set. Adapters with transaction support must wrap both phases so
    /// a failed insert never leaves a stale-plus-fresh mixture; without
    /// transactions, the deactivate-first ordering leaves the role with
    /// zero active grants on failure.
    async fn replace_all_permissions(
        &self,
        role_id: RoleId,
        permissions: Vec<Permission>,
    ) -> AppResult<()>;
}
