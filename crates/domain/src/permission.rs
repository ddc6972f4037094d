use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use protecta_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::country::CountryCode;
use crate::role::RoleId;

/// Unique identifier for a permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Protected resource kinds covered by permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Employee records, including protected personal fields.
    Employees,
    /// Safety training sessions and attendance.
    Trainings,
    /// Tenant organizations and their locations.
    Organizations,
    /// Generated compliance documents.
    Documents,
    /// Workplace incident reports.
    Incidents,
    /// Audit trail entries.
    Audit,
    /// Role and permission administration.
    Roles,
    /// Tenant-level settings.
    Settings,
}

impl Resource {
    /// Returns a stable storage value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employees => "employees",
            Self::Trainings => "trainings",
            Self::Organizations => "organizations",
            Self::Documents => "documents",
            Self::Incidents => "incidents",
            Self::Audit => "audit",
            Self::Roles => "roles",
            Self::Settings => "settings",
        }
    }

    /// Returns all protected resource kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Resource] = &[
            Resource::Employees,
            Resource::Trainings,
            Resource::Organizations,
            Resource::Documents,
            Resource::Incidents,
            Resource::Audit,
            Resource::Roles,
            Resource::Settings,
        ];

        ALL
    }
}

impl FromStr for Resource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "employees" => Ok(Self::Employees),
            "trainings" => Ok(Self::Trainings),
            "organizations" => Ok(Self::Organizations),
            "documents" => Ok(Self::Documents),
            "incidents" => Ok(Self::Incidents),
            "audit" => Ok(Self::Audit),
            "roles" => Ok(Self::Roles),
            "settings" => Ok(Self::Settings),
            _ => Err(AppError::Validation(format!(
                "unknown resource value '{value}'"
            ))),
        }
    }
}

/// Actions grantable on a protected resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create new records.
    Create,
    /// Read existing records.
    Read,
    /// Update existing records.
    Update,
    /// Delete records.
    Delete,
    /// Full administrative control over the resource.
    Manage,
    /// Approve pending records.
    Approve,
    /// Generate derived artifacts such as documents.
    Generate,
    /// Export records in bulk.
    Export,
}

impl Action {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
            Self::Approve => "approve",
            Self::Generate => "generate",
            Self::Export => "export",
        }
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "manage" => Ok(Self::Manage),
            "approve" => Ok(Self::Approve),
            "generate" => Ok(Self::Generate),
            "export" => Ok(Self::Export),
            _ => Err(AppError::Validation(format!(
                "unknown action value '{value}'"
            ))),
        }
    }
}

/// Per-field visibility policy attached to a permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldVisibility {
    /// The field is removed from responses.
    Hidden,
    /// The field is returned in redacted form.
    Masked,
    /// The field is returned as stored.
    Visible,
}

impl FieldVisibility {
    /// Returns a stable storage value for this visibility level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Masked => "masked",
            Self::Visible => "visible",
        }
    }

    /// Parses a storage string into a visibility level.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "hidden" => Ok(Self::Hidden),
            "masked" => Ok(Self::Masked),
            "visible" => Ok(Self::Visible),
            _ => Err(AppError::Validation(format!(
                "unknown field visibility '{value}'"
            ))),
        }
    }

    /// Returns the more restrictive of two visibility levels.
    ///
    /// Precedence when merging across roles: hidden > masked > visible.
    #[must_use]
    pub fn most_restrictive(self, other: Self) -> Self {
        if self.rank() >= other.rank() { self } else { other }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Hidden => 2,
            Self::Masked => 1,
            Self::Visible => 0,
        }
    }
}

/// A single (role, resource, action) grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Owning role.
    pub role_id: RoleId,
    /// Protected resource kind.
    pub resource: Resource,
    /// Granted action.
    pub action: Action,
    /// Per-field visibility overrides for the resource.
    pub field_restrictions: BTreeMap<String, FieldVisibility>,
    /// Open predicate bag reserved for attribute-based rules.
    ///
    /// Stored and returned verbatim; the evaluator never interprets it.
    pub conditions: serde_json::Value,
    /// Country the grant applies to; None means global.
    pub country_code: Option<CountryCode>,
    /// Soft activation flag.
    pub is_active: bool,
}

impl Permission {
    /// Returns whether this grant satisfies a check for the given
    /// resource and action under the tenant's country.
    ///
    /// A grant without a country code matches any tenant; a scoped grant
    /// matches only tenants in that country.
    #[must_use]
    pub fn grants(
        &self,
        resource: Resource,
        action: Action,
        tenant_country: Option<&CountryCode>,
    ) -> bool {
        if !self.is_active || self.resource != resource || self.action != action {
            return false;
        }

        match (&self.country_code, tenant_country) {
            (None, _) => true,
            (Some(scope), Some(country)) => scope == country,
            (Some(_), None) => false,
        }
    }
}
