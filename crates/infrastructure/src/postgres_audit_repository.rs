use async_trait::async_trait;
use sqlx::PgPool;

use protecta_application::{AuditEvent, AuditRepository};
use protecta_core::AppResult;

use crate::storage::map_storage_error;

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_audit_events (
                company_id,
                actor,
                action,
                resource_type,
                resource_id,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.company_id.map(|company_id| company_id.as_uuid()))
        .bind(event.actor.as_uuid())
        .bind(event.action.as_str())
        .bind(event.resource_type)
        .bind(event.resource_id)
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to append audit event"))?;

        Ok(())
    }
}
