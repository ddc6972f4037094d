use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use protecta_application::LegacyMembershipStore;
use protecta_core::{AppResult, CompanyId, UserId};
use protecta_domain::LegacyMembership;

use crate::storage::map_storage_error;

/// PostgreSQL-backed read-only adapter over the pre-migration membership
/// table.
#[derive(Clone)]
pub struct PostgresLegacyMembershipRepository {
    pool: PgPool,
}

impl PostgresLegacyMembershipRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LegacyMembershipRow {
    user_id: Uuid,
    organization_id: Uuid,
    role: String,
    is_active: bool,
}

#[async_trait]
impl LegacyMembershipStore for PostgresLegacyMembershipRepository {
    async fn list_active_memberships(
        &self,
        user_id: UserId,
        organization_id: Option<CompanyId>,
    ) -> AppResult<Vec<LegacyMembership>> {
        let rows = sqlx::query_as::<_, LegacyMembershipRow>(
            r#"
            SELECT user_id, organization_id, role, is_active
            FROM legacy_memberships
            WHERE user_id = $1
                AND is_active
                AND ($2::uuid IS NULL OR organization_id = $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(organization_id.map(|organization_id| organization_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to list legacy memberships"))?;

        Ok(rows
            .into_iter()
            .map(|row| LegacyMembership {
                user_id: UserId::from_uuid(row.user_id),
                organization_id: CompanyId::from_uuid(row.organization_id),
                role: row.role,
                is_active: row.is_active,
            })
            .collect())
    }
}
