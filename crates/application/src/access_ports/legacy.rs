use async_trait::async_trait;
use protecta_core::{AppResult, CompanyId, UserId};
use protecta_domain::LegacyMembership;

/// Read-only port over the pre-migration membership table.
///
/// Consulted only by the legacy fallback path of the role resolver.
#[async_trait]
pub trait LegacyMembershipStore: Send + Sync {
    /// Lists active legacy memberships for a user, optionally narrowed to
    /// one organization.
    async fn list_active_memberships(
        &self,
        user_id: UserId,
        organization_id: Option<CompanyId>,
    ) -> AppResult<Vec<LegacyMembership>>;
}
