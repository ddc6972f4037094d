use async_trait::async_trait;
use protecta_core::{AppResult, CompanyId};
use protecta_domain::CountryCode;

/// Lookup port resolving a tenant to its country.
///
/// Country-scoped permissions match only tenants in their country, so the
/// evaluator needs this one lookup per check.
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// Returns the country of a company, if it has one recorded.
    async fn find_country(&self, company_id: CompanyId) -> AppResult<Option<CountryCode>>;
}
