//! Query construction helpers. Per §9 "String-interpolated queries": no
//! user input is ever interpolated into query text — only a fixed,
//! whitelisted label name may be, and only after a membership check.

use kg_core::error::KgError;
use kg_core::tenant::scope_clause;

/// Labels this adapter is willing to interpolate into a Cypher pattern.
/// Anything outside this set is rejected before it ever reaches a query
/// string.
pub const ALLOWED_LABELS: &[&str] = &[
    "Epic",
    "Sprint",
    "Task",
    "ADR",
    "PRD",
    "Charter",
    "Principle",
    "ContextModule",
    "Pattern",
    "Gotcha",
    "Event",
    "DeadLetterEntry",
    "VerificationResult",
    "QualityOverride",
];

pub fn validate_label(label: &str) -> Result<&'static str, KgError> {
    ALLOWED_LABELS
        .iter()
        .find(|l| **l == label)
        .copied()
        .ok_or_else(|| KgError::validation(format!("unknown label: {label}")))
}

/// The fixed relationship vocabulary from §3 — the only type names this
/// adapter ever interpolates into a Cypher pattern, and only after this
/// check. Shared by `repository.rs` (caller-supplied relationship creation)
/// and `reconciler.rs` (edge transfer during duplicate merges), so both
/// paths validate against the same list.
pub const ALLOWED_RELATIONSHIP_TYPES: &[&str] = &[
    "CONTAINS",
    "BELONGS_TO",
    "HAS_CRITERION",
    "IMPLEMENTS",
    "APPLIES_PATTERN",
    "AVOID_GOTCHA",
    "MUST_FOLLOW",
    "VERIFIED_BY",
    "OVERRIDDEN_BY",
    "PERFORMED_OVERRIDE",
    "NEXT_TASK",
    "MIGRATED_REL",
];

pub fn validate_rel_type(rel_type: &str) -> Result<&'static str, KgError> {
    ALLOWED_RELATIONSHIP_TYPES
        .iter()
        .find(|r| **r == rel_type)
        .copied()
        .ok_or_else(|| KgError::validation(format!("unknown relationship type: {rel_type}")))
}

/// The fixed write template from §4.3: authorship monotonicity plus the
/// dual-property-name convergence, in one MERGE. `__created` is a
/// transient marker only — it's read back via `WITH` and `REMOVE`d before
/// `RETURN` so it never lands on the node as a persisted property (it must
/// not leak into `GET /nodes/:id`'s JSON shape).
pub fn upsert_template(label: &str) -> String {
    format!(
        r#"
MERGE (n:{label} {{id: $id, graph_id: $tenant}})
ON CREATE SET n.createdAt = $now, n.createdBy = $principal, n.__created = 1
ON MATCH  SET n.__created = 0
SET n += $fields, n.graph_id = $tenant, n.graphId = $tenant,
    n.updatedAt = $now, n.updatedBy = $principal
WITH n, n.__created AS created
REMOVE n.__created
RETURN created, n
"#
    )
}

/// A MATCH clause scoped by tenant for an arbitrary whitelisted label.
pub fn scoped_match(alias: &str, label: &str) -> String {
    format!("MATCH ({alias}:{label}) WHERE {}", scope_clause(alias))
}

/// Caps the GraphQL `nodeGraph` traversal depth at 5 (§11.1 of the full
/// spec) before it is interpolated into a variable-length Cypher pattern.
pub fn clamp_traversal_depth(requested: u32) -> u32 {
    requested.min(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_label() {
        assert!(validate_label("DROP").is_err());
        assert!(validate_label("Epic; DETACH DELETE n").is_err());
    }

    #[test]
    fn accepts_known_label() {
        assert_eq!(validate_label("Epic").unwrap(), "Epic");
    }

    #[test]
    fn depth_clamped_at_five() {
        assert_eq!(clamp_traversal_depth(2), 2);
        assert_eq!(clamp_traversal_depth(99), 5);
    }
}
