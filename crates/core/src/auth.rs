use serde::{Deserialize, Serialize};

use crate::{CompanyId, UserId};

/// Authenticated actor resolved by the identity provider for one request.
///
/// Carried down the call chain as an explicit value; the access layer never
/// reads actor state from process-wide storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: UserId,
    display_name: String,
    email: Option<String>,
    company_id: Option<CompanyId>,
}

impl UserIdentity {
    /// Creates a user identity from authentication and tenancy data.
    #[must_use]
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        email: Option<String>,
        company_id: Option<CompanyId>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            email,
            company_id,
        }
    }

    /// Returns the stable user identifier from the identity provider.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the company the actor is operating under, if tenant-scoped.
    ///
    /// Platform staff acting outside any tenant carry no company.
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }
}
