//! C8 — dead-letter state machine over `GraphGateway` (§4.8). The transient
//! `retrying` state in the spec's diagram is never persisted: a single
//! `retry()` call re-applies the event and writes the terminal outcome
//! (`resolved` / `pending` with `retry_count+1` / `abandoned`) in one shot,
//! since nothing here observes an in-flight retry mid-call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kg_core::error::KgError;
use kg_core::graph_value::GraphRow;
use kg_core::ports::{DeadLetterQueue, GraphGateway, Result};
use kg_core::retry_ladder::remaining_gate;
use kg_core::tenant::{scope_clause, scope_write_clause};
use kg_core::types::{DeadLetterEntry, DlqStatus, Event, TenantId};
use serde_json::Value;
use uuid::Uuid;

const DLQ_COLUMNS: &str = "d.id AS id, d.graph_id AS graph_id, d.original_event_json AS original_event_json, \
    d.failure_reason AS failure_reason, d.failed_at AS failed_at, d.retry_count AS retry_count, \
    d.last_retry_at AS last_retry_at, d.status AS status";

fn parse_ts(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&Utc))
}

fn status_from_str(s: &str) -> DlqStatus {
    match s {
        "retrying" => DlqStatus::Retrying,
        "resolved" => DlqStatus::Resolved,
        "abandoned" => DlqStatus::Abandoned,
        _ => DlqStatus::Pending,
    }
}

fn row_to_entry(row: &GraphRow) -> DeadLetterEntry {
    let original_event = row
        .get_string("original_event_json")
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null);
    DeadLetterEntry {
        id: row.get_string("id").unwrap_or_default(),
        graph_id: row.get_string("graph_id").unwrap_or_default(),
        original_event,
        failure_reason: row.get_string("failure_reason").unwrap_or_default(),
        failed_at: parse_ts(row.get_string("failed_at")).unwrap_or_else(Utc::now),
        retry_count: row.get_i64("retry_count").max(0) as u32,
        last_retry_at: parse_ts(row.get_string("last_retry_at")),
        status: status_from_str(&row.get_string("status").unwrap_or_default()),
    }
}

pub struct GraphDeadLetterQueue {
    gateway: Arc<dyn GraphGateway>,
    max_retries: u32,
}

impl GraphDeadLetterQueue {
    pub fn new(gateway: Arc<dyn GraphGateway>, max_retries: u32) -> Self {
        Self { gateway, max_retries }
    }

    async fn fetch_entry(&self, tenant: &TenantId, id: &str) -> Result<Option<DeadLetterEntry>> {
        let query = format!("MATCH (d:DeadLetterEntry {{id: $id}}) WHERE ({}) RETURN {DLQ_COLUMNS}", scope_clause("d"));
        let mut params = HashMap::new();
        params.insert("id".into(), Value::String(id.to_string()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        let rows = self.gateway.execute(&query, params).await?;
        Ok(rows.first().map(row_to_entry))
    }

    /// Re-applies the stored original event with the same idempotent
    /// MERGE-on-id shape C7's first-time write uses, so a duplicate replay
    /// never creates a second node.
    async fn reapply_event(&self, tenant: &TenantId, original_event: &Value) -> Result<()> {
        let event: Event = serde_json::from_value(original_event.clone())
            .map_err(|e| KgError::validation(format!("malformed original_event: {e}")))?;
        let impact_str = match event.impact {
            kg_core::types::Impact::High => "high",
            kg_core::types::Impact::Medium => "medium",
            kg_core::types::Impact::Low => "low",
        };
        let query = format!(
            "MERGE (e:Event {{id: $id}}) SET {write}, e.user_id = $user_id, e.agent_id = $agent_id, \
             e.project_id = $project_id, e.timestamp = $timestamp, e.category = $category, \
             e.description = $description, e.files = $files, e.impact = $impact, e.branch = $branch, \
             e.tags = $tags, e.shared = $shared, e.commit_hash = $commit_hash, e.pressure = $pressure",
            write = scope_write_clause("e")
        );
        let mut params = HashMap::new();
        params.insert("id".into(), Value::String(event.id));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("user_id".into(), Value::String(event.user_id));
        params.insert("agent_id".into(), event.agent_id.map(Value::String).unwrap_or(Value::Null));
        params.insert("project_id".into(), Value::String(tenant.as_str().to_string()));
        params.insert("timestamp".into(), Value::String(event.timestamp.to_rfc3339()));
        params.insert("category".into(), Value::String(event.category));
        params.insert("description".into(), Value::String(event.description));
        params.insert("files".into(), Value::Array(event.files.into_iter().map(Value::String).collect()));
        params.insert("impact".into(), Value::String(impact_str.to_string()));
        params.insert("branch".into(), event.branch.map(Value::String).unwrap_or(Value::Null));
        params.insert("tags".into(), Value::Array(event.tags.into_iter().map(Value::String).collect()));
        params.insert("shared".into(), Value::Bool(event.shared));
        params.insert("commit_hash".into(), event.commit_hash.map(Value::String).unwrap_or(Value::Null));
        params.insert("pressure".into(), event.pressure.map(Value::String).unwrap_or(Value::Null));

        self.gateway.execute(&query, params).await?;
        Ok(())
    }

    async fn persist_outcome(
        &self,
        tenant: &TenantId,
        id: &str,
        status: DlqStatus,
        retry_count: u32,
        failure_reason: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let query = format!(
            "MATCH (d:DeadLetterEntry {{id: $id}}) WHERE ({}) \
             SET d.status = $status, d.retry_count = $retry_count, d.failure_reason = $failure_reason, d.last_retry_at = $now",
            scope_clause("d")
        );
        let mut params = HashMap::new();
        params.insert("id".into(), Value::String(id.to_string()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("status".into(), Value::String(status.as_str().to_string()));
        params.insert("retry_count".into(), Value::from(retry_count));
        params.insert("failure_reason".into(), Value::String(failure_reason.to_string()));
        params.insert("now".into(), Value::String(now.to_rfc3339()));
        self.gateway.execute(&query, params).await?;
        Ok(())
    }
}

#[async_trait]
impl DeadLetterQueue for GraphDeadLetterQueue {
    async fn enqueue(&self, tenant: &TenantId, original_event: Value, failure_reason: String) -> Result<DeadLetterEntry> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let original_event_json = serde_json::to_string(&original_event)
            .map_err(|e| KgError::validation(format!("original_event not serializable: {e}")))?;

        let query = format!(
            "CREATE (d:DeadLetterEntry {{id: $id, {write}, original_event_json: $original_event_json, \
             failure_reason: $failure_reason, failed_at: $failed_at, retry_count: 0, \
             last_retry_at: null, status: 'pending'}})",
            write = scope_write_clause("d")
        );
        let mut params = HashMap::new();
        params.insert("id".into(), Value::String(id.clone()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("original_event_json".into(), Value::String(original_event_json));
        params.insert("failure_reason".into(), Value::String(failure_reason.clone()));
        params.insert("failed_at".into(), Value::String(now.to_rfc3339()));
        self.gateway.execute(&query, params).await?;

        Ok(DeadLetterEntry {
            id,
            graph_id: tenant.as_str().to_string(),
            original_event,
            failure_reason,
            failed_at: now,
            retry_count: 0,
            last_retry_at: None,
            status: DlqStatus::Pending,
        })
    }

    async fn get(&self, tenant: &TenantId, id: &str) -> Result<Option<DeadLetterEntry>> {
        self.fetch_entry(tenant, id).await
    }

    async fn list(&self, tenant: &TenantId, status: Option<DlqStatus>, limit: u32) -> Result<Vec<DeadLetterEntry>> {
        let limit = limit.clamp(1, 100);
        let query = format!(
            "MATCH (d:DeadLetterEntry) WHERE ({}) AND ($status IS NULL OR d.status = $status) \
             RETURN {DLQ_COLUMNS} ORDER BY d.failed_at DESC LIMIT $limit",
            scope_clause("d")
        );
        let mut params = HashMap::new();
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert(
            "status".into(),
            status.map(|s| Value::String(s.as_str().to_string())).unwrap_or(Value::Null),
        );
        params.insert("limit".into(), Value::from(limit));
        let rows = self.gateway.execute(&query, params).await?;
        Ok(rows.iter().map(row_to_entry).collect())
    }

    async fn retry(&self, tenant: &TenantId, id: &str, now: DateTime<Utc>) -> Result<kg_core::dto::DlqRetryOutcome> {
        let entry = self.fetch_entry(tenant, id).await?.ok_or_else(|| KgError::not_found(format!("dlq entry {id}")))?;

        if entry.status.is_terminal() {
            return Ok(kg_core::dto::DlqRetryOutcome {
                success: false,
                status: entry.status,
                retry_count: entry.retry_count,
                failure_reason: Some("entry is already in a terminal state".into()),
                remaining_secs: None,
            });
        }

        if let Some(remaining_secs) = remaining_gate(entry.retry_count, entry.last_retry_at, now) {
            return Err(KgError::TooEarly { remaining_secs });
        }

        let (status, retry_count, failure_reason, success) = match self.reapply_event(tenant, &entry.original_event).await {
            Ok(()) => (DlqStatus::Resolved, entry.retry_count, entry.failure_reason.clone(), true),
            Err(e) => {
                let retry_count = entry.retry_count + 1;
                let status = if retry_count >= self.max_retries { DlqStatus::Abandoned } else { DlqStatus::Pending };
                let failure_reason = format!("{}; retry {retry_count} failed: {e}", entry.failure_reason);
                (status, retry_count, failure_reason, false)
            }
        };

        self.persist_outcome(tenant, id, status, retry_count, &failure_reason, now)
            .await
            .map_err(|e| KgError::ServiceUnavailable(format!("failed to persist retry outcome: {e}")))?;

        Ok(kg_core::dto::DlqRetryOutcome { success, status, retry_count, failure_reason: Some(failure_reason), remaining_secs: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_core::graph_value::GraphValue;
    use std::sync::Mutex;

    struct FakeGateway {
        entry: Mutex<HashMap<String, GraphValue>>,
        fail_reapply: bool,
    }

    #[async_trait]
    impl GraphGateway for FakeGateway {
        async fn execute(&self, query: &str, params: HashMap<String, Value>) -> Result<Vec<GraphRow>> {
            if query.contains("SET d.status") {
                let mut e = self.entry.lock().unwrap();
                e.insert("status".into(), GraphValue::Str(params["status"].as_str().unwrap().to_string()));
                e.insert("retry_count".into(), GraphValue::Int(params["retry_count"].as_i64().unwrap()));
                return Ok(vec![]);
            }
            if query.starts_with("MATCH (d:DeadLetterEntry {id:") {
                return Ok(vec![GraphRow(self.entry.lock().unwrap().clone())]);
            }
            if query.starts_with("MERGE (e:Event") {
                if self.fail_reapply {
                    return Err(KgError::Internal(anyhow::anyhow!("graph write failed")));
                }
                return Ok(vec![]);
            }
            Ok(vec![])
        }

        async fn verify_connectivity(&self) -> Result<()> {
            Ok(())
        }
    }

    fn base_entry() -> HashMap<String, GraphValue> {
        let mut m = HashMap::new();
        m.insert("id".into(), GraphValue::Str("dlq_1".into()));
        m.insert("graph_id".into(), GraphValue::Str("acme".into()));
        m.insert(
            "original_event_json".into(),
            GraphValue::Str(
                serde_json::to_string(&serde_json::json!({
                    "id": "evt_1", "user_id": "u1", "agent_id": null, "project_id": "acme",
                    "timestamp": "2026-07-27T00:00:00Z", "category": "git", "description": "x",
                    "files": [], "impact": "low", "branch": null, "tags": [], "shared": false,
                    "commit_hash": null, "pressure": null
                }))
                .unwrap(),
            ),
        );
        m.insert("failure_reason".into(), GraphValue::Str("boom".into()));
        m.insert("failed_at".into(), GraphValue::Str("2026-07-27T00:00:00Z".into()));
        m.insert("retry_count".into(), GraphValue::Int(0));
        m.insert("last_retry_at".into(), GraphValue::Null);
        m.insert("status".into(), GraphValue::Str("pending".into()));
        m
    }

    #[tokio::test]
    async fn retry_too_early_returns_err_with_remaining_secs() {
        let mut e = base_entry();
        e.insert("last_retry_at".into(), GraphValue::Str("2026-07-27T00:00:00Z".into()));
        let gateway = Arc::new(FakeGateway { entry: Mutex::new(e), fail_reapply: false });
        let dlq = GraphDeadLetterQueue::new(gateway, 3);
        let tenant = TenantId::new("acme");
        let now = DateTime::parse_from_rfc3339("2026-07-27T00:00:10Z").unwrap().with_timezone(&Utc);
        let err = dlq.retry(&tenant, "dlq_1", now).await.unwrap_err();
        assert!(matches!(err, KgError::TooEarly { remaining_secs } if remaining_secs == 50));
    }

    #[tokio::test]
    async fn retry_success_resolves_entry() {
        let gateway = Arc::new(FakeGateway { entry: Mutex::new(base_entry()), fail_reapply: false });
        let dlq = GraphDeadLetterQueue::new(gateway, 3);
        let tenant = TenantId::new("acme");
        let now = DateTime::parse_from_rfc3339("2026-07-27T01:00:00Z").unwrap().with_timezone(&Utc);
        let outcome = dlq.retry(&tenant, "dlq_1", now).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.status, DlqStatus::Resolved);
    }

    #[tokio::test]
    async fn retry_exhaustion_abandons_entry() {
        let mut e = base_entry();
        e.insert("retry_count".into(), GraphValue::Int(2));
        let gateway = Arc::new(FakeGateway { entry: Mutex::new(e), fail_reapply: true });
        let dlq = GraphDeadLetterQueue::new(gateway, 3);
        let tenant = TenantId::new("acme");
        let now = DateTime::parse_from_rfc3339("2026-07-27T01:00:00Z").unwrap().with_timezone(&Utc);
        let outcome = dlq.retry(&tenant, "dlq_1", now).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status, DlqStatus::Abandoned);
        assert_eq!(outcome.retry_count, 3);
    }
}
