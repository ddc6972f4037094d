//! Application services and ports for the Protecta access-control core.

#![forbid(unsafe_code)]

mod access_admin_service;
mod access_ports;
mod access_scope;
mod audit;
mod field_restrictions;
mod permission_evaluator;
mod role_resolver;

pub use access_admin_service::AccessAdminService;
pub use access_ports::{
    AssignRoleInput, AssignmentStore, CompanyDirectory, CreateRoleInput, LegacyMembershipStore,
    PermissionGrantInput, PermissionStore, RoleStore, UpdatePermissionInput, UpdateRoleInput,
    ValidAssignment,
};
pub use access_scope::{AccessScope, AccessService};
pub use audit::{AuditEvent, AuditRepository};
pub use field_restrictions::FieldRestrictionResolver;
pub use permission_evaluator::PermissionEvaluator;
pub use role_resolver::{ResolvedRole, RoleResolver};
