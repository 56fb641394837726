//! Resolves the tenant a request operates on from the caller's validated
//! claims. The (excluded) auth subsystem is responsible for deciding which
//! tenants a principal may act as; this only reads what it already decided.

use kg_core::error::KgError;
use kg_core::principal::Principal;
use kg_core::types::TenantId;

use crate::error::AppError;

pub fn resolve_tenant(principal: &Principal) -> Result<TenantId, AppError> {
    principal
        .tenancy
        .as_ref()
        .map(TenantId::new)
        .ok_or_else(|| AppError::from(KgError::Unauthorized("principal carries no tenancy claim".into())))
}
