use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use protecta_core::{AppError, AppResult, CompanyId, UserId, UserIdentity};
use protecta_domain::{
    Action, AssignmentId, CountryCode, LegacyMembership, Permission, PermissionId, Resource, Role,
    RoleId, RoleKey, UserRoleAssignment,
};

use crate::access_ports::{
    AssignRoleInput, AssignmentStore, CompanyDirectory, CreateRoleInput, LegacyMembershipStore,
    PermissionGrantInput, PermissionStore, RoleStore, UpdateRoleInput, ValidAssignment,
};
use crate::audit::{AuditEvent, AuditRepository};
use crate::permission_evaluator::PermissionEvaluator;
use crate::role_resolver::RoleResolver;

use super::AccessAdminService;

#[derive(Default)]
struct MemRoleStore {
    roles: Mutex<Vec<Role>>,
}

#[async_trait]
impl RoleStore for MemRoleStore {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.lock().await;
        if roles.iter().any(|stored| stored.role_key == role.role_key) {
            return Err(AppError::DuplicateRoleKey(role.role_key.to_string()));
        }
        roles.push(role);
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> AppResult<()> {
        let mut roles = self.roles.lock().await;
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
            .lock()
            .await
            .iter()
            .find(|stored| stored.id == role_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))
    }

    async fn get_role_by_key(&self, role_key: &RoleKey) -> AppResult<Role> {
        self.roles
            .lock()
            .await
            .iter()
            .find(|stored| &stored.role_key == role_key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_key}'")))
    }

    async fn list_roles(&self, country_filter: Option<&CountryCode>) -> AppResult<Vec<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .filter(|role| match country_filter {
                None => true,
                Some(country) => role.applies_to_country(country),
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct MemPermissionStore {
    permissions: Mutex<Vec<Permission>>,
}

#[async_trait]
impl PermissionStore for MemPermissionStore {
    async fn list_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .filter(|permission| permission.role_id == role_id && permission.is_active)
            .cloned()
            .collect())
    }

    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .filter(|permission| permission.is_active && role_ids.contains(&permission.role_id))
            .cloned()
            .collect())
    }

    async fn get_permission(&self, permission_id: PermissionId) -> AppResult<Permission> {
        self.permissions
            .lock()
            .await
            .iter()
            .find(|permission| permission.id == permission_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("permission '{permission_id}'")))
    }

    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        let mut permissions = self.permissions.lock().await;
        let collides = permissions.iter().any(|stored| {
            stored.is_active
                && stored.role_id == permission.role_id
                && stored.resource == permission.resource
                && stored.action == permission.action
                && stored.country_code == permission.country_code
        });
        if collides {
            return Err(AppError::DuplicatePermission(format!(
                "({}, {})",
                permission.resource.as_str(),
                permission.action.as_str()
            )));
        }
        permissions.push(permission);
        Ok(())
    }

    async fn update_permission(&self, permission: &Permission) -> AppResult<()> {
        let mut permissions = self.permissions.lock().await;
        match permissions.iter_mut().find(|stored| stored.id == permission.id) {
            Some(stored) => {
                *stored = permission.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("permission '{}'", permission.id))),
        }
    }

    async fn deactivate_permission(&self, permission_id: PermissionId) -> AppResult<()> {
        let mut permissions = self.permissions.lock().await;
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
        let mut permissions = self.permissions.lock().await;
        for stored in permissions.iter_mut() {
            if stored.role_id == role_id {
                stored.is_active = false;
            }
        }
        permissions.extend(new_set);
        Ok(())
    }
}

struct MemAssignmentStore {
    assignments: Mutex<Vec<UserRoleAssignment>>,
    roles: Arc<MemRoleStore>,
}

#[async_trait]
impl AssignmentStore for MemAssignmentStore {
    async fn insert_assignment(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        let mut assignments = self.assignments.lock().await;
        let collides = assignments.iter().any(|stored| {
            stored.is_active
                && stored.user_id == assignment.user_id
                && stored.role_id == assignment.role_id
                && stored.company_id == assignment.company_id
        });
        if collides {
            return Err(AppError::DuplicateAssignment(format!(
                "{}:{}",
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
        let mut assignments = self.assignments.lock().await;
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
        let assignments = self.assignments.lock().await;
        let roles = self.roles.roles.lock().await;

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
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|assignment| {
                assignment.is_active
                    && assignment.user_id == user_id
                    && assignment.applies_to_tenant(tenant)
            })
            .cloned()
            .collect())
    }

    async fn list_role_assignees(
        &self,
        role_id: RoleId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|assignment| {
                assignment.is_active
                    && assignment.role_id == role_id
                    && assignment.applies_to_tenant(tenant)
            })
            .cloned()
            .collect())
    }
}

struct FakeLegacyStore;

#[async_trait]
impl LegacyMembershipStore for FakeLegacyStore {
    async fn list_active_memberships(
        &self,
        _user_id: UserId,
        _organization_id: Option<CompanyId>,
    ) -> AppResult<Vec<LegacyMembership>> {
        Ok(Vec::new())
    }
}

struct FakeCompanyDirectory;

#[async_trait]
impl CompanyDirectory for FakeCompanyDirectory {
    async fn find_country(&self, _company_id: CompanyId) -> AppResult<Option<CountryCode>> {
        Ok(None)
    }
}

#[derive(Default)]
struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

struct Harness {
    service: AccessAdminService,
    audit: Arc<FakeAuditRepository>,
    admin: UserIdentity,
    super_admin_role_id: RoleId,
}

fn system_role(key: &str, created_by: UserId) -> Role {
    Role {
        id: RoleId::new(),
        role_key: RoleKey::new(key).unwrap_or_else(|_| panic!("test role key")),
        role_name: key.to_owned(),
        description: None,
        country_code: None,
        is_system: true,
        is_active: true,
        created_by,
        created_at: Utc::now(),
        metadata: serde_json::Value::Null,
    }
}

fn harness(admin_is_super: bool) -> Harness {
    let admin_user = UserId::new();
    let super_admin = system_role("super_admin", admin_user);
    let super_admin_role_id = super_admin.id;

    let mut assignments = Vec::new();
    if admin_is_super {
        assignments.push(UserRoleAssignment {
            id: AssignmentId::new(),
            user_id: admin_user,
            role_id: super_admin_role_id,
            company_id: None,
            location_id: None,
            granted_by: admin_user,
            granted_at: Utc::now(),
            expires_at: None,
            is_active: true,
        });
    }

    let roles = Arc::new(MemRoleStore {
        roles: Mutex::new(vec![super_admin]),
    });
    let permissions = Arc::new(MemPermissionStore::default());
    let assignment_store = Arc::new(MemAssignmentStore {
        assignments: Mutex::new(assignments),
        roles: roles.clone(),
    });

    let resolver = Arc::new(RoleResolver::new(
        assignment_store.clone(),
        Arc::new(FakeLegacyStore),
    ));
    let evaluator = PermissionEvaluator::new(
        resolver,
        permissions.clone(),
        Arc::new(FakeCompanyDirectory),
    );

    let audit = Arc::new(FakeAuditRepository::default());
    let service = AccessAdminService::new(
        roles,
        permissions,
        assignment_store,
        evaluator,
        audit.clone(),
    );

    Harness {
        service,
        audit,
        admin: UserIdentity::new(admin_user, "admin", None, None),
        super_admin_role_id,
    }
}

fn create_role_input(key: &str) -> CreateRoleInput {
    CreateRoleInput {
        role_key: key.to_owned(),
        role_name: key.to_owned(),
        description: None,
        country_code: None,
        metadata: serde_json::Value::Null,
    }
}

fn read_grant(resource: Resource) -> PermissionGrantInput {
    PermissionGrantInput {
        resource,
        action: Action::Read,
        field_restrictions: BTreeMap::new(),
        conditions: serde_json::Value::Null,
        country_code: None,
    }
}

#[tokio::test]
async fn create_role_requires_manage_permission() {
    let harness = harness(false);

    let result = harness
        .service
        .create_role(&harness.admin, create_role_input("ops"))
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn create_role_persists_and_audits() {
    let harness = harness(true);

    let result = harness
        .service
        .create_role(&harness.admin, create_role_input("consultant_ssm"))
        .await;

    assert!(result.is_ok());
    assert_eq!(harness.audit.events.lock().await.len(), 1);
}

#[tokio::test]
async fn duplicate_role_key_is_rejected() {
    let harness = harness(true);

    let first = harness
        .service
        .create_role(&harness.admin, create_role_input("consultant_ssm"))
        .await;
    assert!(first.is_ok());

    let second = harness
        .service
        .create_role(&harness.admin, create_role_input("consultant_ssm"))
        .await;
    assert!(matches!(second, Err(AppError::DuplicateRoleKey(_))));
}

#[tokio::test]
async fn system_role_rename_is_protected() {
    let harness = harness(true);

    let result = harness
        .service
        .update_role(
            &harness.admin,
            harness.super_admin_role_id,
            UpdateRoleInput {
                role_name: Some("root".to_owned()),
                ..UpdateRoleInput::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::SystemRoleProtected(_))));
}

#[tokio::test]
async fn system_role_rescope_is_protected() {
    let harness = harness(true);

    let result = harness
        .service
        .update_role(
            &harness.admin,
            harness.super_admin_role_id,
            UpdateRoleInput {
                country_code: CountryCode::new("RO").ok(),
                ..UpdateRoleInput::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::SystemRoleProtected(_))));
}

#[tokio::test]
async fn system_role_deactivation_is_protected() {
    let harness = harness(true);

    let via_update = harness
        .service
        .update_role(
            &harness.admin,
            harness.super_admin_role_id,
            UpdateRoleInput {
                is_active: Some(false),
                ..UpdateRoleInput::default()
            },
        )
        .await;
    assert!(matches!(via_update, Err(AppError::SystemRoleProtected(_))));

    let via_delete = harness
        .service
        .deactivate_role(&harness.admin, harness.super_admin_role_id)
        .await;
    assert!(matches!(via_delete, Err(AppError::SystemRoleProtected(_))));
}

#[tokio::test]
async fn system_role_description_change_is_allowed() {
    let harness = harness(true);

    let result = harness
        .service
        .update_role(
            &harness.admin,
            harness.super_admin_role_id,
            UpdateRoleInput {
                description: Some("platform owner".to_owned()),
                ..UpdateRoleInput::default()
            },
        )
        .await;

    assert!(result.is_ok_and(|role| role.description.as_deref() == Some("platform owner")));
}

#[tokio::test]
async fn duplicate_permission_tuple_is_rejected() {
    let harness = harness(true);
    let role = harness
        .service
        .create_role(&harness.admin, create_role_input("hr_manager"))
        .await
        .unwrap_or_else(|_| panic!("role setup"));

    let first = harness
        .service
        .add_permission(&harness.admin, role.id, read_grant(Resource::Employees))
        .await;
    assert!(first.is_ok());

    let second = harness
        .service
        .add_permission(&harness.admin, role.id, read_grant(Resource::Employees))
        .await;
    assert!(matches!(second, Err(AppError::DuplicatePermission(_))));
}

#[tokio::test]
async fn replace_all_permissions_swaps_the_active_set() {
    let harness = harness(true);
    let role = harness
        .service
        .create_role(&harness.admin, create_role_input("hr_manager"))
        .await
        .unwrap_or_else(|_| panic!("role setup"));

    let added = harness
        .service
        .add_permission(&harness.admin, role.id, read_grant(Resource::Employees))
        .await;
    assert!(added.is_ok());

    let replaced = harness
        .service
        .replace_all_permissions(
            &harness.admin,
            role.id,
            vec![read_grant(Resource::Trainings), read_grant(Resource::Audit)],
        )
        .await;
    assert!(replaced.is_ok());

    let active = harness
        .service
        .list_permissions(&harness.admin, role.id)
        .await
        .unwrap_or_default();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|permission| {
        permission.resource == Resource::Trainings || permission.resource == Resource::Audit
    }));
}

#[tokio::test]
async fn replacement_set_with_internal_duplicate_is_rejected() {
    let harness = harness(true);
    let role = harness
        .service
        .create_role(&harness.admin, create_role_input("hr_manager"))
        .await
        .unwrap_or_else(|_| panic!("role setup"));

    let result = harness
        .service
        .replace_all_permissions(
            &harness.admin,
            role.id,
            vec![read_grant(Resource::Employees), read_grant(Resource::Employees)],
        )
        .await;

    assert!(matches!(result, Err(AppError::DuplicatePermission(_))));
}

#[tokio::test]
async fn duplicate_assignment_is_rejected() {
    let harness = harness(true);
    let role = harness
        .service
        .create_role(&harness.admin, create_role_input("angajat"))
        .await
        .unwrap_or_else(|_| panic!("role setup"));
    let user_id = UserId::new();
    let company_id = Some(CompanyId::new());
    let input = AssignRoleInput {
        user_id,
        role_id: role.id,
        company_id,
        location_id: None,
        expires_at: None,
    };

    let first = harness.service.assign_role(&harness.admin, input.clone()).await;
    assert!(first.is_ok());

    let second = harness.service.assign_role(&harness.admin, input).await;
    assert!(matches!(second, Err(AppError::DuplicateAssignment(_))));
}

#[tokio::test]
async fn revoke_role_is_idempotent() {
    let harness = harness(true);
    let role = harness
        .service
        .create_role(&harness.admin, create_role_input("angajat"))
        .await
        .unwrap_or_else(|_| panic!("role setup"));
    let user_id = UserId::new();

    let assigned = harness
        .service
        .assign_role(
            &harness.admin,
            AssignRoleInput {
                user_id,
                role_id: role.id,
                company_id: None,
                location_id: None,
                expires_at: None,
            },
        )
        .await;
    assert!(assigned.is_ok());

    let first = harness
        .service
        .revoke_role(&harness.admin, user_id, role.id, None)
        .await;
    let second = harness
        .service
        .revoke_role(&harness.admin, user_id, role.id, None)
        .await;

    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn assign_role_rejects_past_expiry() {
    let harness = harness(true);
    let role = harness
        .service
        .create_role(&harness.admin, create_role_input("angajat"))
        .await
        .unwrap_or_else(|_| panic!("role setup"));

    let result = harness
        .service
        .assign_role(
            &harness.admin,
            AssignRoleInput {
                user_id: UserId::new(),
                role_id: role.id,
                company_id: None,
                location_id: None,
                expires_at: Some(Utc::now() - Duration::hours(1)),
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn assign_role_for_unknown_role_is_not_found() {
    let harness = harness(true);

    let result = harness
        .service
        .assign_role(
            &harness.admin,
            AssignRoleInput {
                user_id: UserId::new(),
                role_id: RoleId::new(),
                company_id: None,
                location_id: None,
                expires_at: None,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_roles_filters_by_country() {
    let harness = harness(true);

    let mut romanian = create_role_input("consultant_ssm");
    romanian.country_code = CountryCode::new("RO").ok();
    let mut german = create_role_input("sifa_consultant");
    german.country_code = CountryCode::new("DE").ok();

    let created_ro = harness.service.create_role(&harness.admin, romanian).await;
    let created_de = harness.service.create_role(&harness.admin, german).await;
    assert!(created_ro.is_ok());
    assert!(created_de.is_ok());

    let filter = CountryCode::new("RO").unwrap_or_else(|_| panic!("test"));
    let visible = harness
        .service
        .list_roles(&harness.admin, Some(&filter))
        .await
        .unwrap_or_default();

    // Global super_admin plus the Romanian role; the German role is hidden.
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().any(|role| role.role_key.as_str() == "consultant_ssm"));
    assert!(visible.iter().all(|role| role.role_key.as_str() != "sifa_consultant"));
}
