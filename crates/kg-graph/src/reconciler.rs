//! C4 — Duplicate Reconciler. Finds structural duplicates by canonical
//! identity, picks a survivor, migrates edges, archives losers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kg_core::canonical::{epic_canonical, sprint_canonical};
use kg_core::dto::{DuplicateGroupDetail, MergeReport};
use kg_core::graph_value::GraphRow;
use kg_core::ports::{DuplicateReconciler, GraphGateway, Result};
use kg_core::types::TenantId;
use serde_json::Value;

/// Property keys the survivor always takes from the loser, even when it
/// already has a value — §4.4's "content-bearing fields are preferred from
/// whichever node carries richer content" rule.
const CONTENT_FIELDS: &[&str] = &["content", "summary", "embedding", "embedding_model"];

#[derive(Clone, Copy)]
enum EdgeDirection {
    Incoming,
    Outgoing,
}

pub struct GraphDuplicateReconciler {
    gateway: Arc<dyn GraphGateway>,
}

impl GraphDuplicateReconciler {
    pub fn new(gateway: Arc<dyn GraphGateway>) -> Self {
        Self { gateway }
    }

    /// Re-homes every edge of a given direction from the loser onto the
    /// survivor: discover the relationship types actually present, then for
    /// each type (validated against the fixed vocabulary in `cypher.rs`)
    /// recreate the edge with the same properties and delete the original.
    /// No `apoc.refactor.*` — plain `MATCH`/`CREATE`/`DELETE`, consistent
    /// with the rest of this crate's whitelist-and-interpolate discipline.
    async fn transfer_edges(
        &self,
        label: &str,
        survivor_eid: &str,
        loser_eid: &str,
        direction: EdgeDirection,
    ) -> Result<u32> {
        let types_query = match direction {
            EdgeDirection::Incoming => format!(
                "MATCH (x)-[r]->(l:{label}) WHERE elementId(l) = $loser_eid RETURN DISTINCT type(r) AS rtype"
            ),
            EdgeDirection::Outgoing => format!(
                "MATCH (l:{label})-[r]->(x) WHERE elementId(l) = $loser_eid RETURN DISTINCT type(r) AS rtype"
            ),
        };
        let mut params = HashMap::new();
        params.insert("loser_eid".into(), Value::String(loser_eid.to_string()));
        let type_rows = self.gateway.execute(&types_query, params).await?;

        let mut transferred = 0u32;
        for type_row in &type_rows {
            let Some(rtype) = type_row.get_string("rtype") else { continue };
            let Ok(rtype) = crate::cypher::validate_rel_type(&rtype) else { continue };
            let transfer_query = match direction {
                EdgeDirection::Incoming => format!(
                    "MATCH (x)-[r:{rtype}]->(l:{label}) WHERE elementId(l) = $loser_eid \
                     MATCH (s:{label}) WHERE elementId(s) = $survivor_eid \
                     WITH x, r, s, properties(r) AS props \
                     CREATE (x)-[r2:{rtype}]->(s) \
                     SET r2 = props \
                     WITH r, r2 \
                     DELETE r \
                     RETURN count(r2) AS n"
                ),
                EdgeDirection::Outgoing => format!(
                    "MATCH (l:{label})-[r:{rtype}]->(x) WHERE elementId(l) = $loser_eid \
                     MATCH (s:{label}) WHERE elementId(s) = $survivor_eid \
                     WITH x, r, s, properties(r) AS props \
                     CREATE (s)-[r2:{rtype}]->(x) \
                     SET r2 = props \
                     WITH r, r2 \
                     DELETE r \
                     RETURN count(r2) AS n"
                ),
            };
            let mut params = HashMap::new();
            params.insert("loser_eid".into(), Value::String(loser_eid.to_string()));
            params.insert("survivor_eid".into(), Value::String(survivor_eid.to_string()));
            let rows = self.gateway.execute(&transfer_query, params).await?;
            transferred += rows.first().map(|r| r.get_i64("n") as u32).unwrap_or(0);
        }
        Ok(transferred)
    }

    async fn candidates(&self, tenant: &TenantId, label: &str) -> Result<Vec<CandidateNode>> {
        let query = format!(
            "MATCH (n:{label}) WHERE ({}) \
             OPTIONAL MATCH (n)-[r]-() \
             WITH n, count(r) AS rel_count \
             RETURN elementId(n) AS eid, n.id AS id, n.sprint_id AS sprint_id, \
                    n.epic_id AS epic_id, n.title AS title, \
                    coalesce(n.updatedAt, n.createdAt) AS ts, rel_count, \
                    size([k IN keys(n) WHERE n[k] IS NOT NULL]) AS prop_count",
            kg_core::tenant::scope_clause("n")
        );
        let mut params = HashMap::new();
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        let rows = self.gateway.execute(&query, params).await?;
        Ok(rows.into_iter().map(CandidateNode::from_row).collect())
    }

    /// Groups by canonical id; returns only groups with ≥2 members.
    fn group(entities: Vec<CandidateNode>, label: &str) -> Vec<Vec<CandidateNode>> {
        let mut groups: HashMap<String, Vec<CandidateNode>> = HashMap::new();
        for c in entities {
            let canonical = if label == "Sprint" {
                sprint_canonical(&c.id, c.sprint_id.as_deref())
            } else {
                epic_canonical(&c.id, c.epic_id.as_deref())
            };
            groups.entry(canonical).or_default().push(c);
        }
        groups.into_values().filter(|g| g.len() > 1).collect()
    }

    /// Survivor selection per §4.4: rank by (updatedAt/createdAt desc,
    /// hasNonEmptyTitle, relationshipCount, nonNullPropertyCount), tie-break
    /// by lexicographic element id.
    fn pick_survivor(mut group: Vec<CandidateNode>) -> (CandidateNode, Vec<CandidateNode>) {
        group.sort_by(|a, b| {
            b.ts.cmp(&a.ts)
                .then(b.has_title().cmp(&a.has_title()))
                .then(b.rel_count.cmp(&a.rel_count))
                .then(b.prop_count.cmp(&a.prop_count))
                .then(a.element_id.cmp(&b.element_id))
        });
        let survivor = group.remove(0);
        (survivor, group)
    }

    async fn merge_group(
        &self,
        tenant: &TenantId,
        label: &str,
        canonical: &str,
        survivor: &CandidateNode,
        losers: Vec<CandidateNode>,
        dry_run: bool,
    ) -> Result<DuplicateGroupDetail> {
        let mut rels_transferred = 0u32;
        let mut orphan_ids = Vec::new();

        for loser in &losers {
            orphan_ids.push(loser.element_id.clone());
            if dry_run {
                continue;
            }

            // 1. Merge properties: fetch both property bags and diff them in
            // Rust, then `SET` only the keys that need copying — loser's
            // non-null values fill survivor's gaps, and content-bearing
            // fields are always preferred from the loser. Plain Cypher only;
            // no `apoc.map.*` helper.
            let props_query = format!(
                "MATCH (s:{label}) WHERE elementId(s) = $survivor_eid \
                 MATCH (l:{label}) WHERE elementId(l) = $loser_eid \
                 RETURN properties(s) AS survivor_props, properties(l) AS loser_props"
            );
            let mut params = HashMap::new();
            params.insert("survivor_eid".into(), Value::String(survivor.element_id.clone()));
            params.insert("loser_eid".into(), Value::String(loser.element_id.clone()));
            let rows = self.gateway.execute(&props_query, params).await?;
            if let Some(row) = rows.first() {
                let survivor_props = row.get("survivor_props");
                let loser_props = row.get("loser_props");
                if let (Some(survivor_map), Some(loser_map)) =
                    (survivor_props.as_map(), loser_props.as_map())
                {
                    let mut to_copy = serde_json::Map::new();
                    for (k, v) in loser_map {
                        if k == "id" || v.is_null() {
                            continue;
                        }
                        let survivor_has_value = survivor_map
                            .get(k)
                            .map(|sv| !sv.is_null() && sv.as_str() != Some(""))
                            .unwrap_or(false);
                        if !survivor_has_value || CONTENT_FIELDS.contains(&k.as_str()) {
                            to_copy.insert(k.clone(), v.to_json());
                        }
                    }
                    if !to_copy.is_empty() {
                        let set_query =
                            format!("MATCH (s:{label}) WHERE elementId(s) = $survivor_eid SET s += $props");
                        let mut params = HashMap::new();
                        params.insert("survivor_eid".into(), Value::String(survivor.element_id.clone()));
                        params.insert("props".into(), Value::Object(to_copy));
                        self.gateway.execute(&set_query, params).await?;
                    }
                }
            }

            // 2. Transfer incoming edges: find the relationship types
            // actually present, then for each (validated against the fixed
            // vocabulary, per the `validate_label`/`validate_rel_type`
            // whitelist-and-interpolate discipline) recreate a fresh edge on
            // the survivor and delete the original.
            rels_transferred += self
                .transfer_edges(label, &survivor.element_id, &loser.element_id, EdgeDirection::Incoming)
                .await?;

            // 3. Transfer outgoing edges (symmetric).
            rels_transferred += self
                .transfer_edges(label, &survivor.element_id, &loser.element_id, EdgeDirection::Outgoing)
                .await?;

            // 4. Archive the loser — never delete.
            let archive_tenant = tenant.archive_namespace(Utc::now());
            let archive_query = format!(
                "MATCH (l:{label}) WHERE elementId(l) = $loser_eid \
                 SET l.graph_id = $archive_tenant, l.graphId = $archive_tenant, \
                     l.archived_from = $tenant, l.archived_at = $now, \
                     l.archived_reason = 'duplicate_cleanup', l.kept_element_id = $survivor_eid"
            );
            let mut params = HashMap::new();
            params.insert("loser_eid".into(), Value::String(loser.element_id.clone()));
            params.insert("archive_tenant".into(), Value::String(archive_tenant));
            params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
            params.insert("now".into(), Value::String(Utc::now().to_rfc3339()));
            params.insert("survivor_eid".into(), Value::String(survivor.element_id.clone()));
            self.gateway.execute(&archive_query, params).await?;
        }

        Ok(DuplicateGroupDetail {
            entity_type: label.to_string(),
            canonical_id: canonical.to_string(),
            survivor_id: survivor.id.clone(),
            orphan_id: orphan_ids,
            relationships_transferred: rels_transferred,
        })
    }
}

struct CandidateNode {
    element_id: String,
    id: String,
    sprint_id: Option<String>,
    epic_id: Option<String>,
    title: Option<String>,
    ts: String,
    rel_count: i64,
    prop_count: i64,
}

impl CandidateNode {
    fn from_row(row: GraphRow) -> Self {
        Self {
            element_id: row.get_string("eid").unwrap_or_default(),
            id: row.get_string("id").unwrap_or_default(),
            sprint_id: row.get_string("sprint_id"),
            epic_id: row.get_string("epic_id"),
            title: row.get_string("title"),
            ts: row.get_string("ts").unwrap_or_default(),
            rel_count: row.get_i64("rel_count"),
            prop_count: row.get_i64("prop_count"),
        }
    }

    fn has_title(&self) -> bool {
        self.title.as_deref().map(|t| !t.is_empty()).unwrap_or(false)
    }
}

#[async_trait]
impl DuplicateReconciler for GraphDuplicateReconciler {
    async fn reconcile(&self, tenant: &TenantId, dry_run: bool) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        for label in ["Sprint", "Epic"] {
            let candidates = self.candidates(tenant, label).await?;
            let groups = Self::group(candidates, label);

            for group in groups {
                let (survivor, losers) = Self::pick_survivor(group);
                let canonical = if label == "Sprint" {
                    sprint_canonical(&survivor.id, survivor.sprint_id.as_deref())
                } else {
                    epic_canonical(&survivor.id, survivor.epic_id.as_deref())
                };
                // Each group's merge is independent — a failure here must
                // not abort groups already processed (§4.4 failure semantics).
                match self
                    .merge_group(tenant, label, &canonical, &survivor, losers, dry_run)
                    .await
                {
                    Ok(detail) => {
                        report.merged += 1;
                        report.details.push(detail);
                    }
                    Err(e) => {
                        tracing::error!(canonical = %canonical, error = %e, "duplicate merge failed for group");
                    }
                }
            }
        }

        Ok(report)
    }
}
