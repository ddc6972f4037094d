//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod database;
mod in_memory_access_store;
mod postgres_assignment_repository;
mod postgres_audit_repository;
mod postgres_company_directory;
mod postgres_legacy_membership_repository;
mod postgres_permission_repository;
mod postgres_role_repository;
mod storage;

pub use database::connect_and_migrate;
pub use in_memory_access_store::InMemoryAccessStore;
pub use postgres_assignment_repository::PostgresAssignmentRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_company_directory::PostgresCompanyDirectory;
pub use postgres_legacy_membership_repository::PostgresLegacyMembershipRepository;
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_role_repository::PostgresRoleRepository;
