//! C2 — Tenant Scope. Every repository and synthesizer query is rewritten
//! to restrict node access to a `graphId` namespace, accepting both the
//! snake_case and camelCase property spellings during the migration window
//! (§4.2, §9 "Mixed `graph_id` / `graphId` property names").

use crate::types::TenantId;

/// The dual-property WHERE clause fragment every scoped query embeds, e.g.
/// `(n.graph_id = $tenant OR n.graphId = $tenant)`. `alias` is the Cypher
/// variable bound to the node being scoped.
pub fn scope_clause(alias: &str) -> String {
    format!("({alias}.graph_id = $tenant OR {alias}.graphId = $tenant)")
}

/// The property-set fragment a write uses to keep both spellings in sync,
/// per §4.2's "new records are always written with both fields identical"
/// rule.
pub fn scope_write_clause(alias: &str) -> String {
    format!("{alias}.graph_id = $tenant, {alias}.graphId = $tenant")
}

/// Whether a row's tenant properties satisfy scoping for `tenant` — the
/// in-process equivalent of `scope_clause`, used by components that filter
/// already-fetched rows (e.g. the Context Synthesizer's in-memory merges).
pub fn row_in_tenant(graph_id: Option<&str>, graph_id_camel: Option<&str>, tenant: &TenantId) -> bool {
    graph_id == Some(tenant.as_str()) || graph_id_camel == Some(tenant.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_clause_checks_both_spellings() {
        let clause = scope_clause("n");
        assert!(clause.contains("n.graph_id = $tenant"));
        assert!(clause.contains("n.graphId = $tenant"));
        assert!(clause.contains("OR"));
    }

    #[test]
    fn row_in_tenant_accepts_either_spelling() {
        let t = TenantId::new("acme");
        assert!(row_in_tenant(Some("acme"), None, &t));
        assert!(row_in_tenant(None, Some("acme"), &t));
        assert!(!row_in_tenant(Some("other"), None, &t));
    }
}
