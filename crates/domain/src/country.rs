use std::fmt::{Display, Formatter};

use protecta_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Validated ISO 3166-1 alpha-2 country code, stored uppercase.
///
/// A role or permission without a country code applies globally across
/// tenant countries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    /// Creates a validated country code from a two-letter value.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_uppercase();

        if trimmed.len() != 2 || !trimmed.chars().all(|character| character.is_ascii_uppercase()) {
            return Err(AppError::Validation(format!(
                "country code must be two ASCII letters, got '{value}'"
            )));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated country code string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CountryCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
