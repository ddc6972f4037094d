use async_trait::async_trait;
use protecta_core::AppResult;
use protecta_domain::{CountryCode, Role, RoleId, RoleKey};

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRoleInput {
    /// Globally unique immutable key.
    pub role_key: String,
    /// Display label.
    pub role_name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Country scope; None means global.
    pub country_code: Option<CountryCode>,
    /// Open key-value bag for non-core attributes.
    pub metadata: serde_json::Value,
}

/// Partial update for a role definition; None fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRoleInput {
    /// New display label.
    pub role_name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New country scope.
    pub country_code: Option<CountryCode>,
    /// New metadata bag.
    pub metadata: Option<serde_json::Value>,
    /// New activation state.
    pub is_active: Option<bool>,
}

/// Repository port for role definitions.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Persists a new role.
    ///
    /// Fails with `DuplicateRoleKey` when the key is already taken, backed
    /// by a storage-level uniqueness constraint.
    async fn insert_role(&self, role: Role) -> AppResult<()>;

    /// Persists the full updated state of an existing role.
    async fn update_role(&self, role: &Role) -> AppResult<()>;

    /// Loads a role by identifier.
    async fn get_role(&self, role_id: RoleId) -> AppResult<Role>;

    /// Loads a role by its stable key.
    async fn get_role_by_key(&self, role_key: &RoleKey) -> AppResult<Role>;

    /// Lists roles visible to tenants in the given country.
    ///
    /// Returns global roles plus roles scoped to the filter country; with
    /// no filter, returns every role.
    async fn list_roles(&self, country_filter: Option<&CountryCode>) -> AppResult<Vec<Role>>;
}
