use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by administrative use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a custom role is created.
    RoleCreated,
    /// Emitted when a role definition is updated.
    RoleUpdated,
    /// Emitted when a role is soft-deactivated.
    RoleDeactivated,
    /// Emitted when a permission grant is added to a role.
    PermissionAdded,
    /// Emitted when a permission grant is updated.
    PermissionUpdated,
    /// Emitted when a permission grant is soft-deactivated.
    PermissionRemoved,
    /// Emitted when a role's permission set is bulk-replaced.
    PermissionsReplaced,
    /// Emitted when a role is assigned to a user.
    RoleAssigned,
    /// Emitted when a role assignment is revoked.
    RoleRevoked,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "access.role.created",
            Self::RoleUpdated => "access.role.updated",
            Self::RoleDeactivated => "access.role.deactivated",
            Self::PermissionAdded => "access.permission.added",
            Self::PermissionUpdated => "access.permission.updated",
            Self::PermissionRemoved => "access.permission.removed",
            Self::PermissionsReplaced => "access.permission.replaced_all",
            Self::RoleAssigned => "access.assignment.created",
            Self::RoleRevoked => "access.assignment.revoked",
        }
    }
}
