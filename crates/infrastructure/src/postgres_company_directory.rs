use async_trait::async_trait;
use sqlx::PgPool;

use protecta_application::CompanyDirectory;
use protecta_core::{AppError, AppResult, CompanyId};
use protecta_domain::CountryCode;

use crate::storage::map_storage_error;

/// PostgreSQL-backed lookup from a company to its country.
#[derive(Clone)]
pub struct PostgresCompanyDirectory {
    pool: PgPool,
}

impl PostgresCompanyDirectory {
    /// Creates a directory with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyDirectory for PostgresCompanyDirectory {
    async fn find_country(&self, company_id: CompanyId) -> AppResult<Option<CountryCode>> {
        let value = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT country_code
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to load company country"))?
        .flatten();

        value
            .map(|country| {
                CountryCode::new(country.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "invalid stored country code '{country}': {error}"
                    ))
                })
            })
            .transpose()
    }
}
