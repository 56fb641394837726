//! C7 — append-only event log with cursor-based tailing and long-poll
//! (§4.7). The poll loop's client-abort awareness is implicit in Rust's
//! future-cancellation semantics: when the caller (the excluded HTTP layer)
//! drops this future on disconnect, the in-flight `sleep` is cancelled
//! immediately and nothing further runs — "abandon the poll loop promptly"
//! needs no explicit abort-signal plumbing here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kg_core::dto::{StreamRequest, StreamResponse};
use kg_core::ports::{EventStream, GraphGateway, Result};
use kg_core::tenant::{scope_clause, scope_write_clause};
use kg_core::types::{Event, TenantId};
use serde_json::Value;
use tokio::time::{Duration, Instant};

use crate::row::row_to_event;

const EVENT_COLUMNS: &str = "e.id AS id, e.user_id AS user_id, e.agent_id AS agent_id, e.project_id AS project_id, \
    e.timestamp AS timestamp, e.category AS category, e.description AS description, e.files AS files, \
    e.impact AS impact, e.branch AS branch, e.tags AS tags, e.shared AS shared, \
    e.commit_hash AS commit_hash, e.pressure AS pressure";

pub struct GraphEventStream {
    gateway: Arc<dyn GraphGateway>,
    poll_interval: Duration,
}

impl GraphEventStream {
    pub fn new(gateway: Arc<dyn GraphGateway>, poll_interval: Duration) -> Self {
        Self { gateway, poll_interval }
    }

    async fn resolve_cursor_timestamp(&self, tenant: &TenantId, cursor_id: &str) -> Result<DateTime<Utc>> {
        let query = format!(
            "MATCH (e:Event {{id: $id}}) WHERE ({}) RETURN e.timestamp AS timestamp LIMIT 1",
            scope_clause("e")
        );
        let mut params = HashMap::new();
        params.insert("id".into(), Value::String(cursor_id.to_string()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        let rows = self.gateway.execute(&query, params).await?;
        let row = rows
            .first()
            .ok_or_else(|| kg_core::error::KgError::validation(format!("unknown cursor: {cursor_id}")))?;
        row.get_string("timestamp")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| kg_core::error::KgError::validation(format!("cursor {cursor_id} has no timestamp")))
    }

    /// Over-fetches `limit + 1` so truncation (`hasMore`) can be detected
    /// without a second round trip. `since` absent fetches DESC then
    /// reverses, per §4.7 ("fetch DESC then reverse").
    async fn fetch_page(
        &self,
        tenant: &TenantId,
        since: Option<DateTime<Utc>>,
        categories: &[String],
        agent_id: Option<&str>,
        limit: u32,
    ) -> Result<(Vec<Event>, bool)> {
        let ascending = since.is_some();
        let dir = if ascending { "ASC" } else { "DESC" };
        let query = format!(
            "MATCH (e:Event) WHERE ({}) \
             AND ($since IS NULL OR e.timestamp > $since) \
             AND (size($categories) = 0 OR e.category IN $categories) \
             AND ($agent_id IS NULL OR e.agent_id = $agent_id) \
             RETURN {EVENT_COLUMNS} \
             ORDER BY e.timestamp {dir}, e.id {dir} \
             LIMIT $fetch_limit",
            scope_clause("e")
        );
        let mut params = HashMap::new();
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert(
            "since".into(),
            since.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null),
        );
        params.insert(
            "categories".into(),
            Value::Array(categories.iter().map(|c| Value::String(c.clone())).collect()),
        );
        params.insert(
            "agent_id".into(),
            agent_id.map(|a| Value::String(a.to_string())).unwrap_or(Value::Null),
        );
        params.insert("fetch_limit".into(), Value::from(limit + 1));

        let mut rows = self.gateway.execute(&query, params).await?;
        let has_more = rows.len() as u32 > limit;
        rows.truncate(limit as usize);
        let mut events: Vec<Event> = rows.iter().map(row_to_event).collect();
        if !ascending {
            events.reverse();
        }
        Ok((events, has_more))
    }
}

#[async_trait]
impl EventStream for GraphEventStream {
    async fn append(&self, tenant: &TenantId, event: Event) -> Result<()> {
        let query = format!(
            "CREATE (e:Event {{id: $id, {write}, user_id: $user_id, agent_id: $agent_id, \
             project_id: $project_id, timestamp: $timestamp, category: $category, \
             description: $description, files: $files, impact: $impact, branch: $branch, \
             tags: $tags, shared: $shared, commit_hash: $commit_hash, pressure: $pressure}})",
            write = scope_write_clause("e")
        );
        let impact_str = match event.impact {
            kg_core::types::Impact::High => "high",
            kg_core::types::Impact::Medium => "medium",
            kg_core::types::Impact::Low => "low",
        };

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

    async fn stream(&self, tenant: &TenantId, req: StreamRequest) -> Result<StreamResponse> {
        let start = Instant::now();
        let limit = req.limit.clamp(1, 200);
        let timeout = Duration::from_secs(req.timeout_secs.clamp(1, 60) as u64);
        let since_ts = match req.since.as_deref() {
            Some(id) => Some(self.resolve_cursor_timestamp(tenant, id).await?),
            None => None,
        };
        let deadline = start + timeout;

        loop {
            let (events, has_more) =
                self.fetch_page(tenant, since_ts, &req.categories, req.agent_id.as_deref(), limit).await?;

            if !events.is_empty() || Instant::now() >= deadline {
                let last_event_id = events.last().map(|e| e.id.clone()).or_else(|| req.since.clone());
                return Ok(StreamResponse {
                    events,
                    has_more,
                    last_event_id,
                    poll_duration_ms: start.elapsed().as_millis() as u64,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_core::dto::StreamRequest;
    use kg_core::graph_value::{GraphRow, GraphValue};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeGateway {
        polls_before_event: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl GraphGateway for FakeGateway {
        async fn execute(&self, query: &str, _params: HashMap<String, Value>) -> Result<Vec<GraphRow>> {
            if query.starts_with("MATCH (e:Event {id:") {
                let mut m = HashMap::new();
                m.insert("timestamp".to_string(), GraphValue::Str("2026-07-27T00:00:00Z".into()));
                return Ok(vec![GraphRow(m)]);
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.polls_before_event {
                return Ok(Vec::new());
            }
            let mut m = HashMap::new();
            m.insert("id".to_string(), GraphValue::Str("evt_100".into()));
            m.insert("user_id".to_string(), GraphValue::Str("u1".into()));
            m.insert("project_id".to_string(), GraphValue::Str("acme".into()));
            m.insert("timestamp".to_string(), GraphValue::Str("2026-07-27T00:00:05Z".into()));
            m.insert("category".to_string(), GraphValue::Str("decision".into()));
            m.insert("description".to_string(), GraphValue::Str("x".into()));
            Ok(vec![GraphRow(m)])
        }

        async fn verify_connectivity(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn long_poll_wakes_up_once_events_appear() {
        let gateway: Arc<dyn GraphGateway> =
            Arc::new(FakeGateway { polls_before_event: 6, calls: AtomicU32::new(0) });
        let stream = GraphEventStream::new(gateway, Duration::from_millis(500));
        let tenant = TenantId::new("acme");

        let resp = stream
            .stream(
                &tenant,
                StreamRequest { since: Some("evt_99".into()), limit: 50, timeout_secs: 10, categories: vec![], agent_id: None },
            )
            .await
            .unwrap();

        assert_eq!(resp.events.len(), 1);
        assert_eq!(resp.events[0].id, "evt_100");
        assert_eq!(resp.last_event_id.as_deref(), Some("evt_100"));
        assert!(!resp.has_more);
    }

    #[tokio::test(start_paused = true)]
    async fn long_poll_returns_empty_at_deadline() {
        let gateway: Arc<dyn GraphGateway> =
            Arc::new(FakeGateway { polls_before_event: u32::MAX, calls: AtomicU32::new(0) });
        let stream = GraphEventStream::new(gateway, Duration::from_millis(500));
        let tenant = TenantId::new("acme");

        let resp = stream
            .stream(
                &tenant,
                StreamRequest { since: None, limit: 50, timeout_secs: 2, categories: vec![], agent_id: None },
            )
            .await
            .unwrap();

        assert!(resp.events.is_empty());
        assert!(resp.poll_duration_ms >= 2000);
    }

    #[tokio::test]
    async fn unknown_cursor_is_a_validation_error() {
        struct MissingCursorGateway;
        #[async_trait]
        impl GraphGateway for MissingCursorGateway {
            async fn execute(&self, _query: &str, _params: HashMap<String, Value>) -> Result<Vec<GraphRow>> {
                Ok(Vec::new())
            }
            async fn verify_connectivity(&self) -> Result<()> {
                Ok(())
            }
        }
        let gateway: Arc<dyn GraphGateway> = Arc::new(MissingCursorGateway);
        let stream = GraphEventStream::new(gateway, Duration::from_millis(500));
        let tenant = TenantId::new("acme");
        let err = stream
            .stream(&tenant, StreamRequest { since: Some("evt_ghost".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, kg_core::error::KgError::Validation(_)));
    }
}
