use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use protecta_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::country::CountryCode;

/// Stable key of the platform super-admin role.
///
/// Any valid assignment of this role satisfies every permission check
/// unconditionally.
pub const SUPER_ADMIN_KEY: &str = "super_admin";

/// Unique identifier for a role definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
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

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Globally unique, immutable stable name for a role.
///
/// Lowercase snake_case, e.g. `super_admin` or `consultant_ssm`. The key
/// never changes after creation; display labels live in `role_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleKey(String);

impl RoleKey {
    /// Creates a validated role key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation("role key must not be empty".to_owned()));
        }

        if trimmed.len() > 64 {
            return Err(AppError::Validation(
                "role key must not exceed 64 characters".to_owned(),
            ));
        }

        let valid = trimmed
            .chars()
            .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_');
        if !valid {
            return Err(AppError::Validation(format!(
                "role key must be lowercase snake_case, got '{trimmed}'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the validated key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns whether this key names the platform super-admin role.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.0 == SUPER_ADMIN_KEY
    }
}

impl Display for RoleKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named capability bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Globally unique immutable key.
    pub role_key: RoleKey,
    /// Display label.
    pub role_name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Country the role applies to; None means global.
    pub country_code: Option<CountryCode>,
    /// Indicates a platform-defined role with protected fields.
    pub is_system: bool,
    /// Soft activation flag; deactivated roles grant nothing.
    pub is_active: bool,
    /// Administrator who created the role.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Open key-value bag for non-core attributes.
    pub metadata: serde_json::Value,
}

impl Role {
    /// Returns whether the role is visible to tenants in the given country.
    ///
    /// Roles without a country code are global and visible everywhere.
    #[must_use]
    pub fn applies_to_country(&self, country: &CountryCode) -> bool {
        match &self.country_code {
            None => true,
            Some(scope) => scope == country,
        }
    }
}
