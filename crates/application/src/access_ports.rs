//! Store ports consumed by the access-control services.

mod assignments;
mod directory;
mod legacy;
mod permissions;
mod roles;

pub use assignments::{AssignRoleInput, AssignmentStore, ValidAssignment};
pub use directory::CompanyDirectory;
pub use legacy::LegacyMembershipStore;
pub use permissions::{PermissionGrantInput, PermissionStore, UpdatePermissionInput};
pub use roles::{CreateRoleInput, RoleStore, UpdateRoleInput};
