//! C3 — Node Repository. Typed upsert (MERGE-on-identity), read,
//! list-with-filters, relationship create/list.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kg_core::canonical::derive_epic_id_from_sprint_id;
use kg_core::dto::{ListNodesFilter, UpsertResult};
use kg_core::error::KgError;
use kg_core::graph_value::GraphRow;
use kg_core::ports::{GraphGateway, NodeRepository, Result};
use kg_core::principal::Principal;
use kg_core::types::{Direction, Document, Epic, RelationshipEdge, Sprint, Task, TenantId};
use serde_json::Value;

use crate::cypher::{scoped_match, upsert_template, validate_label};

pub struct GraphNodeRepository {
    gateway: Arc<dyn GraphGateway>,
}

impl GraphNodeRepository {
    pub fn new(gateway: Arc<dyn GraphGateway>) -> Self {
        Self { gateway }
    }

    async fn upsert(
        &self,
        label: &str,
        tenant: &TenantId,
        id: &str,
        principal: &Principal,
        fields: Value,
    ) -> Result<UpsertResult> {
        let label = validate_label(label)?;
        if id.is_empty() {
            return Err(KgError::validation("id must not be empty"));
        }
        let query = upsert_template(label);
        let mut params = HashMap::new();
        params.insert("id".into(), Value::String(id.to_string()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("now".into(), Value::String(Utc::now().to_rfc3339()));
        params.insert("principal".into(), Value::String(principal.actor_id.clone()));
        params.insert("fields".into(), fields);

        let rows = self.gateway.execute(&query, params).await?;
        let row = rows.into_iter().next();
        let created = row.as_ref().map(|r| r.get_bool("created")).unwrap_or(false);
        Ok(UpsertResult {
            id: id.to_string(),
            created,
            nodes_created: if created { 1 } else { 0 },
            rels_created: 0,
        })
    }

    /// Runs a `MERGE` link query that reports whether it newly created the
    /// relationship, via the same read-back-then-`REMOVE` transient-marker
    /// shape `upsert_template` uses for node creation.
    async fn merge_link(&self, query: &str, params: HashMap<String, Value>) -> Result<u32> {
        let rows = self.gateway.execute(query, params).await?;
        Ok(rows.first().map(|r| if r.get_bool("created") { 1 } else { 0 }).unwrap_or(0))
    }
}

fn entity_fields(value: &impl serde::Serialize, skip: &[&str]) -> Value {
    let mut obj = serde_json::to_value(value).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut obj {
        for k in skip {
            map.remove(*k);
        }
        map.retain(|_, v| !v.is_null());
    }
    obj
}

#[async_trait]
impl NodeRepository for GraphNodeRepository {
    async fn upsert_epic(&self, tenant: &TenantId, epic: &Epic, principal: &Principal) -> Result<UpsertResult> {
        if epic.title.trim().is_empty() {
            return Err(KgError::validation("epic title must not be empty"));
        }
        let fields = entity_fields(epic, &["id"]);
        let mut result = self.upsert("Epic", tenant, &epic.id, principal, fields).await?;
        if result.created {
            result.nodes_created = 1;
        }
        Ok(result)
    }

    async fn upsert_sprint(&self, tenant: &TenantId, sprint: &Sprint, principal: &Principal) -> Result<UpsertResult> {
        let valid = sprint.id.starts_with("adhoc_")
            || regex_matches_sprint_pattern(&sprint.id);
        if !valid {
            return Err(KgError::validation(format!(
                "sprint id {} does not match e\\d{{3}}_s\\d{{2}} or adhoc_\\d{{6}}_s\\d{{2}}",
                sprint.id
            )));
        }
        // Derived-field policy (§4.3): derive epic_id from the id pattern;
        // caller's explicit value wins on disagreement (with a log, not error).
        let derived_epic_id = derive_epic_id_from_sprint_id(&sprint.id);
        let mut sprint = sprint.clone();
        if let Some(derived) = derived_epic_id {
            if !sprint.epic_id.is_empty() && sprint.epic_id != derived {
                tracing::warn!(
                    sprint_id = %sprint.id,
                    supplied = %sprint.epic_id,
                    derived = %derived,
                    "sprint epic_id disagrees with id-derived value; caller's value wins"
                );
            } else if sprint.epic_id.is_empty() {
                sprint.epic_id = derived;
            }
        }

        let fields = entity_fields(&sprint, &["id"]);
        let mut result = self.upsert("Sprint", tenant, &sprint.id, principal, fields).await?;

        // Link to Epic via BELONGS_TO if the Epic exists with a matching id.
        let link_query = format!(
            "{} MATCH (e:Epic {{id: $epic_id}}) WHERE ({} ) \
             MERGE (s)-[r:BELONGS_TO]->(e) \
             ON CREATE SET r.__created = true ON MATCH SET r.__created = false \
             WITH r, r.__created AS created REMOVE r.__created RETURN created",
            scoped_match("s", "Sprint"),
            kg_core::tenant::scope_clause("e")
        );
        let mut params = HashMap::new();
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("epic_id".into(), Value::String(sprint.epic_id.clone()));
        result.rels_created += self.merge_link(&link_query, params).await.unwrap_or(0);

        Ok(result)
    }

    async fn upsert_task(&self, tenant: &TenantId, task: &Task, principal: &Principal) -> Result<UpsertResult> {
        if task.sprint_id.trim().is_empty() {
            return Err(KgError::validation("task sprint_id must not be empty"));
        }
        let fields = entity_fields(task, &["id"]);
        let mut result = self.upsert("Task", tenant, &task.id, principal, fields).await?;

        let link_query = format!(
            "MATCH (s:Sprint {{id: $sprint_id}}) WHERE ({}) \
             MATCH (t:Task {{id: $task_id}}) WHERE ({}) \
             MERGE (s)-[r:CONTAINS]->(t) \
             ON CREATE SET r.__created = true ON MATCH SET r.__created = false \
             WITH r, r.__created AS created REMOVE r.__created RETURN created",
            kg_core::tenant::scope_clause("s"),
            kg_core::tenant::scope_clause("t"),
        );
        let mut params = HashMap::new();
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("sprint_id".into(), Value::String(task.sprint_id.clone()));
        params.insert("task_id".into(), Value::String(task.id.clone()));
        result.rels_created += self.merge_link(&link_query, params).await.unwrap_or(0);

        Ok(result)
    }

    async fn upsert_document(&self, tenant: &TenantId, doc: &Document, principal: &Principal) -> Result<UpsertResult> {
        if doc.title.trim().is_empty() {
            return Err(KgError::validation("document title must not be empty"));
        }
        let label = doc.label.as_str();
        let fields = entity_fields(doc, &["id", "label"]);
        self.upsert(label, tenant, &doc.id, principal, fields).await
    }

    async fn get_node(&self, tenant: &TenantId, id: &str) -> Result<Option<GraphRow>> {
        if id.is_empty() {
            return Err(KgError::validation("id must not be empty"));
        }
        let query = format!(
            "MATCH (n {{id: $id}}) WHERE ({}) RETURN n LIMIT 1",
            kg_core::tenant::scope_clause("n")
        );
        let mut params = HashMap::new();
        params.insert("id".into(), Value::String(id.to_string()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        let rows = self.gateway.execute(&query, params).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_nodes(&self, tenant: &TenantId, filter: ListNodesFilter) -> Result<Vec<GraphRow>> {
        let filter = filter.normalized();
        let label = match &filter.label {
            Some(l) => validate_label(l)?,
            None => "",
        };
        let match_clause = if label.is_empty() {
            format!("MATCH (n) WHERE ({})", kg_core::tenant::scope_clause("n"))
        } else {
            format!(
                "MATCH (n:{label}) WHERE ({})",
                kg_core::tenant::scope_clause("n")
            )
        };
        let status_clause = if filter.status.is_some() {
            " AND n.status = $status"
        } else {
            ""
        };
        let query = format!(
            "{match_clause}{status_clause} RETURN n ORDER BY n.updatedAt DESC SKIP $offset LIMIT $limit"
        );
        let mut params = HashMap::new();
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("offset".into(), Value::from(filter.offset));
        params.insert("limit".into(), Value::from(filter.limit));
        if let Some(status) = &filter.status {
            params.insert("status".into(), Value::String(status.clone()));
        }
        let mut rows = self.gateway.execute(&query, params).await?;

        // §4.3: post-filter on tags in memory when the tags filter is set
        // (preserved per §9's `nodesByTag` Open Question resolution).
        if !filter.tags.is_empty() {
            rows.retain(|row| {
                let node = row.get("n");
                let Some(map) = node.as_map() else { return false };
                let Some(tags_val) = map.get("tags") else { return false };
                if let kg_core::graph_value::GraphValue::List(tags) = tags_val {
                    tags.iter().any(|t| {
                        t.as_str()
                            .map(|s| filter.tags.iter().any(|f| f == s))
                            .unwrap_or(false)
                    })
                } else {
                    false
                }
            });
        }
        Ok(rows)
    }

    async fn create_relationship(
        &self,
        tenant: &TenantId,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        props: HashMap<String, Value>,
    ) -> Result<bool> {
        let rel_type = sanitize_rel_type(rel_type)?;
        let query = format!(
            "MATCH (a {{id: $from_id}}) WHERE ({}) \
             MATCH (b {{id: $to_id}}) WHERE ({}) \
             MERGE (a)-[r:{rel_type}]->(b) \
             ON CREATE SET r += $props \
             RETURN a.id IS NOT NULL AS endpoints_exist",
            kg_core::tenant::scope_clause("a"),
            kg_core::tenant::scope_clause("b"),
        );
        let mut params = HashMap::new();
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("from_id".into(), Value::String(from_id.to_string()));
        params.insert("to_id".into(), Value::String(to_id.to_string()));
        params.insert("props".into(), Value::Object(props.into_iter().collect()));
        let rows = self.gateway.execute(&query, params).await?;
        if rows.is_empty() {
            return Err(KgError::not_found(format!(
                "relationship endpoint missing: {from_id} or {to_id}"
            )));
        }
        Ok(true)
    }

    async fn list_relationships(
        &self,
        tenant: &TenantId,
        node_id: &str,
        direction: Direction,
    ) -> Result<Vec<RelationshipEdge>> {
        let pattern = match direction {
            Direction::Outgoing => "(n)-[r]->(m)",
            Direction::Incoming => "(n)<-[r]-(m)",
            Direction::Both => "(n)-[r]-(m)",
        };
        let query = format!(
            "MATCH (n {{id: $id}}) WHERE ({}) \
             MATCH {pattern} \
             RETURN type(r) AS rel_type, n.id AS n_id, m.id AS m_id, properties(r) AS props",
            kg_core::tenant::scope_clause("n"),
        );
        let mut params = HashMap::new();
        params.insert("id".into(), Value::String(node_id.to_string()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        let rows = self.gateway.execute(&query, params).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let rel_type = row.get_string("rel_type").unwrap_or_default();
                let n_id = row.get_string("n_id").unwrap_or_default();
                let m_id = row.get_string("m_id").unwrap_or_default();
                let props = row
                    .get("props")
                    .as_map()
                    .map(|m| m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
                    .unwrap_or_default();
                let (from_id, to_id) = match direction {
                    Direction::Incoming => (m_id, n_id),
                    _ => (n_id, m_id),
                };
                RelationshipEdge {
                    rel_type,
                    from_id,
                    to_id,
                    properties: props,
                }
            })
            .collect())
    }
}

/// Relationship type names are a small fixed vocabulary (§3); reject
/// anything else rather than interpolate arbitrary caller input.
fn sanitize_rel_type(rel_type: &str) -> Result<&'static str> {
    crate::cypher::validate_rel_type(rel_type)
}

fn regex_matches_sprint_pattern(id: &str) -> bool {
    // e\d{3}_s\d{2}
    let bytes = id.as_bytes();
    if bytes.first() != Some(&b'e') {
        return false;
    }
    let Some(us) = id.find('_') else { return false };
    let (epic_part, rest) = id.split_at(us);
    if epic_part.len() != 4 || !epic_part[1..].chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let rest = &rest[1..];
    rest.len() == 3 && rest.starts_with('s') && rest[1..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprint_id_pattern_matches_canonical_form() {
        assert!(regex_matches_sprint_pattern("e005_s01"));
        assert!(!regex_matches_sprint_pattern("e5_s1"));
        assert!(!regex_matches_sprint_pattern("not-a-sprint"));
    }

    #[test]
    fn rel_type_whitelist_rejects_unknown() {
        assert!(sanitize_rel_type("DROP_TABLE").is_err());
        assert!(sanitize_rel_type("CONTAINS").is_ok());
    }
}
