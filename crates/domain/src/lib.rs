//! RBAC domain types: roles, permissions, assignments, legacy memberships.

#![forbid(unsafe_code)]

/// Role assignment types and the validity predicate.
pub mod assignment;
/// Audit action vocabulary for administrative mutations.
pub mod audit;
/// Country code scoping for roles and permissions.
pub mod country;
/// Legacy membership records and the migration role mapping.
pub mod legacy;
/// Permission grants, protected resources, and field visibility.
pub mod permission;
/// Role definitions and stable role keys.
pub mod role;

pub use assignment::{AssignmentId, UserRoleAssignment};
pub use audit::AuditAction;
pub use country::CountryCode;
pub use legacy::{LegacyMembership, map_legacy_role};
pub use permission::{Action, FieldVisibility, Permission, PermissionId, Resource};
pub use role::{Role, RoleId, RoleKey, SUPER_ADMIN_KEY};
