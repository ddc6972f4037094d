use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use protecta_core::{AppResult, CompanyId, UserIdentity};
use protecta_domain::{Action, FieldVisibility, Resource, RoleKey};
use tokio::sync::Mutex;

use crate::field_restrictions::FieldRestrictionResolver;
use crate::permission_evaluator::PermissionEvaluator;
use crate::role_resolver::{ResolvedRole, RoleResolver, fail_closed};

/// Entry point for request-scoped access checks.
#[derive(Clone)]
pub struct AccessService {
    resolver: Arc<RoleResolver>,
    evaluator: Arc<PermissionEvaluator>,
    field_restrictions: Arc<FieldRestrictionResolver>,
}

impl AccessService {
    /// Creates the service from the three resolution components.
    #[must_use]
    pub fn new(
        resolver: Arc<RoleResolver>,
        evaluator: Arc<PermissionEvaluator>,
        field_restrictions: Arc<FieldRestrictionResolver>,
    ) -> Self {
        Self {
            resolver,
            evaluator,
            field_restrictions,
        }
    }

    /// Opens an access scope for one authenticated request.
    ///
    /// The scope memoizes role resolution per tenant; it must be dropped
    /// with the request, or a grant revoked mid-flight would keep serving
    /// from the stale cache.
    #[must_use]
    pub fn begin_request(&self, identity: UserIdentity) -> AccessScope {
        AccessScope {
            identity,
            resolver: self.resolver.clone(),
            evaluator: self.evaluator.clone(),
            field_restrictions: self.field_restrictions.clone(),
            resolved: Mutex::new(HashMap::new()),
        }
    }
}

/// Ambient-actor access surface bound to one logical request.
pub struct AccessScope {
    identity: UserIdentity,
    resolver: Arc<RoleResolver>,
    evaluator: Arc<PermissionEvaluator>,
    field_restrictions: Arc<FieldRestrictionResolver>,
    resolved: Mutex<HashMap<Option<CompanyId>, Arc<Vec<ResolvedRole>>>>,
}

impl AccessScope {
    /// Returns the identity the scope was opened for.
    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    async fn resolved_roles(&self, tenant: Option<CompanyId>) -> AppResult<Arc<Vec<ResolvedRole>>> {
        let mut cache = self.resolved.lock().await;
        if let Some(roles) = cache.get(&tenant) {
            tracing::debug!(user_id = %self.identity.user_id(), "role resolution served from request cache");
            return Ok(roles.clone());
        }

        let roles = Arc::new(
            self.resolver
                .resolve_roles(self.identity.user_id(), tenant)
                .await?,
        );
        cache.insert(tenant, roles.clone());
        Ok(roles)
    }

    /// Returns the actor's valid roles under the ambient tenant.
    pub async fn my_roles(&self) -> AppResult<Vec<ResolvedRole>> {
        let roles = self.resolved_roles(self.identity.company_id()).await?;
        Ok(roles.as_ref().clone())
    }

    /// Returns whether the actor holds a valid role with the given key.
    pub async fn has_role(&self, role_key: &RoleKey) -> AppResult<bool> {
        match self.resolved_roles(self.identity.company_id()).await {
            Ok(roles) => Ok(roles.iter().any(|role| &role.role_key == role_key)),
            Err(error) => fail_closed(error, "has_role"),
        }
    }

    /// Returns whether the actor holds a valid super-admin assignment.
    pub async fn is_super_admin(&self) -> AppResult<bool> {
        match self.resolved_roles(self.identity.company_id()).await {
            Ok(roles) => Ok(roles.iter().any(ResolvedRole::is_super_admin)),
            Err(error) => fail_closed(error, "is_super_admin"),
        }
    }

    /// Returns whether the actor may perform the action on the resource.
    pub async fn has_permission(&self, resource: Resource, action: Action) -> AppResult<bool> {
        let tenant = self.identity.company_id();
        let roles = match self.resolved_roles(tenant).await {
            Ok(roles) => roles,
            Err(error) => return fail_closed(error, "has_permission"),
        };

        self.evaluator
            .has_permission_for_roles(&roles, tenant, resource, action)
            .await
    }

    /// Returns the actor's merged field visibility map for a resource.
    pub async fn field_restrictions(
        &self,
        resource: Resource,
    ) -> AppResult<BTreeMap<String, FieldVisibility>> {
        let roles = match self.resolved_roles(self.identity.company_id()).await {
            Ok(roles) => roles,
            Err(error) => return fail_closed(error, "field_restrictions"),
        };

        self.field_restrictions
            .field_restrictions_for_roles(&roles, resource)
            .await
    }

    /// Returns the distinct tenants the actor holds roles under.
    pub async fn my_org_ids(&self) -> AppResult<Vec<CompanyId>> {
        let roles = self.resolved_roles(None).await?;

        let mut org_ids: Vec<CompanyId> = roles
            .iter()
            .filter_map(|role| role.company_id)
            .collect();
        org_ids.sort_by_key(CompanyId::as_uuid);
        org_ids.dedup();
        Ok(org_ids)
    }
}
