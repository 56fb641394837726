//! Read-only Cypher issued by the Context Synthesizer. Every query is
//! parameterized (§9 "string-interpolated queries"); no caller-supplied
//! string reaches query text. Column names are always explicitly aliased
//! to match `kg-context::mappers`' expectations.

use std::collections::HashMap;
use std::sync::Arc;

use kg_core::ports::{GraphGateway, Result};
use kg_core::tenant::scope_clause;
use kg_core::types::{Document, DocumentLabel, Epic, Event, Gotcha, Pattern, Sprint, Task, TenantId};
use serde_json::Value;

use crate::mappers::*;

const SPRINT_COLUMNS: &str =
    "s.id AS id, s.title AS title, s.epic_id AS epic_id, s.status AS status, s.progress AS progress, s.updatedAt AS updated_at";

const EPIC_COLUMNS: &str = "e.id AS id, e.epic_id AS epic_id, e.title AS title, e.goal AS goal, e.vision AS vision, \
    e.status AS status, e.progress AS progress, e.success_criteria AS success_criteria, \
    e.in_scope AS in_scope, e.out_of_scope AS out_of_scope, e.createdBy AS created_by, \
    e.updatedBy AS updated_by, e.createdAt AS created_at, e.updatedAt AS updated_at, \
    e.roadmap_status AS roadmap_status, e.roadmap_lane AS roadmap_lane";

const TASK_COLUMNS: &str = "t.id AS id, t.title AS title, t.sprint_id AS sprint_id, t.epic_id AS epic_id, \
    t.status AS status, t.blocked_reason AS blocked_reason, t.owner AS owner, \
    t.completed_at AS completed_at, t.quality_override AS quality_override";

const EVENT_COLUMNS: &str = "e.id AS id, e.user_id AS user_id, e.agent_id AS agent_id, e.project_id AS project_id, \
    e.timestamp AS timestamp, e.category AS category, e.description AS description, e.files AS files, \
    e.impact AS impact, e.branch AS branch, e.tags AS tags, e.shared AS shared, \
    e.commit_hash AS commit_hash, e.pressure AS pressure";

const PATTERN_COLUMNS: &str = "p.id AS id, p.title AS title, p.confidence AS confidence, \
    p.confidenceScore AS confidence_score, p.category AS category";

const GOTCHA_COLUMNS: &str = "g.id AS id, g.title AS title, g.severity AS severity, \
    g.confidenceScore AS confidence_score, g.symptom AS symptom, g.cause AS cause, \
    g.solution AS solution, g.encounters AS encounters, g.resolutions AS resolutions";

const DOC_COLUMNS: &str = "d.id AS id, d.title AS title, d.content AS content, d.summary AS summary, \
    d.tags AS tags, d.category AS category, d.createdAt AS created_at, d.updatedAt AS updated_at";

fn tenant_param(tenant: &TenantId) -> (String, Value) {
    ("tenant".into(), Value::String(tenant.as_str().to_string()))
}

pub async fn fetch_sprint(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, id: &str) -> Result<Option<Sprint>> {
    let query = format!(
        "MATCH (s:Sprint {{id: $id}}) WHERE ({}) RETURN {SPRINT_COLUMNS} LIMIT 1",
        scope_clause("s")
    );
    let mut params = HashMap::new();
    params.insert("id".into(), Value::String(id.to_string()));
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.first().map(row_to_sprint))
}

pub async fn fetch_epic(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, id: &str) -> Result<Option<Epic>> {
    if id.is_empty() {
        return Ok(None);
    }
    let query = format!(
        "MATCH (e:Epic {{id: $id}}) WHERE ({}) RETURN {EPIC_COLUMNS} LIMIT 1",
        scope_clause("e")
    );
    let mut params = HashMap::new();
    params.insert("id".into(), Value::String(id.to_string()));
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.first().map(row_to_epic))
}

pub async fn fetch_tasks_for_sprint(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, sprint_id: &str) -> Result<Vec<Task>> {
    let query = format!(
        "MATCH (s:Sprint {{id: $sprint_id}})-[:CONTAINS]->(t:Task) WHERE ({}) \
         RETURN {TASK_COLUMNS} ORDER BY t.createdAt ASC",
        scope_clause("t")
    );
    let mut params = HashMap::new();
    params.insert("sprint_id".into(), Value::String(sprint_id.to_string()));
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.iter().map(row_to_task).collect())
}

pub async fn fetch_next_task(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, sprint_id: &str) -> Result<Option<Task>> {
    let query = format!(
        "MATCH (s:Sprint {{id: $sprint_id}})-[:NEXT_TASK]->(t:Task) WHERE ({}) RETURN {TASK_COLUMNS} LIMIT 1",
        scope_clause("t")
    );
    let mut params = HashMap::new();
    params.insert("sprint_id".into(), Value::String(sprint_id.to_string()));
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.first().map(row_to_task))
}

/// Strategy B (§4.6.1): among all non-complete Sprints whose Epic is not
/// retired and which have at least one incomplete Task, pick the one with
/// the most recent task activity, nulls last.
pub async fn strategy_b_sprint(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId) -> Result<Option<Sprint>> {
    let query = format!(
        "MATCH (s:Sprint) WHERE ({}) AND s.status <> 'complete' \
         MATCH (s)-[:BELONGS_TO]->(e:Epic) WHERE ({}) AND NOT coalesce(e.roadmap_lane, '') IN ['done', 'dropped'] \
         MATCH (s)-[:CONTAINS]->(t:Task) WHERE ({}) AND t.status <> 'complete' \
         WITH s, max(t.updatedAt) AS last_activity \
         RETURN {SPRINT_COLUMNS} \
         ORDER BY last_activity IS NULL, last_activity DESC \
         LIMIT 1",
        scope_clause("s"),
        scope_clause("e"),
        scope_clause("t"),
    );
    let mut params = HashMap::new();
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.first().map(row_to_sprint))
}

/// Strategy C (§4.6.1): pure recency fallback — the single most-recently
/// created Sprint regardless of status.
pub async fn strategy_c_sprint(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId) -> Result<Option<Sprint>> {
    let query = format!(
        "MATCH (s:Sprint) WHERE ({}) RETURN {SPRINT_COLUMNS} ORDER BY s.createdAt DESC LIMIT 1",
        scope_clause("s")
    );
    let mut params = HashMap::new();
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.first().map(row_to_sprint))
}

pub async fn fetch_recent_events(
    gateway: &Arc<dyn GraphGateway>,
    tenant: &TenantId,
    user_id: &str,
    limit: u32,
) -> Result<Vec<Event>> {
    let query = format!(
        "MATCH (e:Event) WHERE e.project_id = $tenant AND e.user_id = $user_id \
         RETURN {EVENT_COLUMNS} ORDER BY e.timestamp DESC LIMIT $limit"
    );
    let mut params = HashMap::new();
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    params.insert("user_id".into(), Value::String(user_id.to_string()));
    params.insert("limit".into(), Value::from(limit));
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.iter().map(row_to_event).collect())
}

pub async fn fetch_team_activity(
    gateway: &Arc<dyn GraphGateway>,
    tenant: &TenantId,
    user_id: &str,
    since: chrono::DateTime<chrono::Utc>,
    limit: u32,
) -> Result<Vec<Event>> {
    let query = format!(
        "MATCH (e:Event) WHERE e.project_id = $tenant AND e.user_id <> $user_id \
         AND e.category IN ['decision', 'achievement', 'git', 'fix', 'feature'] \
         AND e.timestamp >= $since AND (e.shared = true OR e.impact = 'high') \
         RETURN {EVENT_COLUMNS} ORDER BY e.timestamp DESC LIMIT $limit"
    );
    let mut params = HashMap::new();
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    params.insert("user_id".into(), Value::String(user_id.to_string()));
    params.insert("since".into(), Value::String(since.to_rfc3339()));
    params.insert("limit".into(), Value::from(limit));
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.iter().map(row_to_event).collect())
}

pub async fn fetch_charter(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId) -> Result<Option<kg_core::dto::CharterSummary>> {
    let query = format!(
        "MATCH (c:Charter) WHERE ({}) RETURN c.summary AS purpose, c.tags AS goals LIMIT 1",
        scope_clause("c")
    );
    let mut params = HashMap::new();
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.first().map(|row| kg_core::dto::CharterSummary {
        purpose: row.get_string("purpose"),
        goals: match row.get("goals") {
            kg_core::graph_value::GraphValue::List(items) => {
                items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
            }
            _ => Vec::new(),
        },
    }))
}

pub async fn fetch_patterns_for_task(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, task_id: &str) -> Result<Vec<Pattern>> {
    let query = format!(
        "MATCH (t:Task {{id: $task_id}})-[:APPLIES_PATTERN]->(p:Pattern) WHERE ({}) \
         RETURN {PATTERN_COLUMNS} ORDER BY p.confidenceScore DESC",
        scope_clause("p")
    );
    let mut params = HashMap::new();
    params.insert("task_id".into(), Value::String(task_id.to_string()));
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.iter().map(row_to_pattern).collect())
}

pub async fn fetch_gotchas_for_task(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, task_id: &str) -> Result<Vec<Gotcha>> {
    let query = format!(
        "MATCH (t:Task {{id: $task_id}})-[:AVOID_GOTCHA]->(g:Gotcha) WHERE ({}) RETURN {GOTCHA_COLUMNS}",
        scope_clause("g")
    );
    let mut params = HashMap::new();
    params.insert("task_id".into(), Value::String(task_id.to_string()));
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    let mut gotchas: Vec<Gotcha> = rows.iter().map(row_to_gotcha).collect();
    // §4.6 enrichment phase: severity ascending (critical first), then
    // descending confidence. `Severity`'s derived `Ord` already encodes
    // critical < high < medium < low.
    gotchas.sort_by(|a, b| a.severity.cmp(&b.severity).then(b.confidence_score.cmp(&a.confidence_score)));
    Ok(gotchas)
}

pub async fn fetch_adr_constraints_for_task(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, task_id: &str) -> Result<Vec<Document>> {
    let query = format!(
        "MATCH (t:Task {{id: $task_id}})-[:MUST_FOLLOW]->(d:ADR) WHERE ({}) RETURN {DOC_COLUMNS}",
        scope_clause("d")
    );
    let mut params = HashMap::new();
    params.insert("task_id".into(), Value::String(task_id.to_string()));
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.iter().map(|r| row_to_document(r, DocumentLabel::Adr)).collect())
}

pub async fn fetch_top_patterns(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, top_k: u32) -> Result<Vec<Pattern>> {
    let query = format!(
        "MATCH (p:Pattern) WHERE ({}) RETURN {PATTERN_COLUMNS} ORDER BY p.createdAt DESC LIMIT $top_k",
        scope_clause("p")
    );
    let mut params = HashMap::new();
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    params.insert("top_k".into(), Value::from(top_k));
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.iter().map(row_to_pattern).collect())
}

pub async fn fetch_top_gotchas(gateway: &Arc<dyn GraphGateway>, tenant: &TenantId, top_k: u32) -> Result<Vec<Gotcha>> {
    let query = format!(
        "MATCH (g:Gotcha) WHERE ({}) RETURN {GOTCHA_COLUMNS} ORDER BY g.createdAt DESC LIMIT $top_k",
        scope_clause("g")
    );
    let mut params = HashMap::new();
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    params.insert("top_k".into(), Value::from(top_k));
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.iter().map(row_to_gotcha).collect())
}

/// Top-K most-recently-created ADR documents ("decisions"), optionally
/// filtered to those whose tags intersect `tags` (§4.6.2).
pub async fn fetch_top_decisions(
    gateway: &Arc<dyn GraphGateway>,
    tenant: &TenantId,
    top_k: u32,
    tags: &[String],
) -> Result<Vec<Document>> {
    let tag_clause = if tags.is_empty() {
        "true".to_string()
    } else {
        "any(t IN $tags WHERE t IN d.tags)".to_string()
    };
    let query = format!(
        "MATCH (d:ADR) WHERE ({}) AND ({tag_clause}) RETURN {DOC_COLUMNS} ORDER BY d.createdAt DESC LIMIT $top_k",
        scope_clause("d")
    );
    let mut params = HashMap::new();
    params.insert(tenant_param(tenant).0, tenant_param(tenant).1);
    params.insert("top_k".into(), Value::from(top_k));
    params.insert(
        "tags".into(),
        Value::Array(tags.iter().map(|t| Value::String(t.clone())).collect()),
    );
    let rows = gateway.execute(&query, params).await?;
    Ok(rows.iter().map(|r| row_to_document(r, DocumentLabel::Adr)).collect())
}
