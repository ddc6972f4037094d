use async_trait::async_trait;
use protecta_core::{AppResult, CompanyId, UserId};
use protecta_domain::AuditAction;

/// Audit event appended for every administrative mutation.
///
/// The compliance domain around this core requires a durable trail of who
/// changed which role, grant, or assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Tenant the mutation happened under, if tenant-scoped.
    pub company_id: Option<CompanyId>,
    /// Acting administrator.
    pub actor: UserId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Kind of the mutated resource.
    pub resource_type: String,
    /// Identifier of the mutated resource.
    pub resource_id: String,
    /// Optional human-readable detail.
    pub detail: Option<String>,
}

/// Append-only port for the audit trail.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
