//! C10 — verification-outcome recording and the human-only override gate
//! (§4.10). The override write is deliberately split into two statements:
//! the `QualityOverride` node and its edges are created first and are
//! never rolled back; the Task's status fields are set in a second call.
//! If that second call fails, the append-only override record still
//! exists — "the audit trail is sacred" (§9) — and the discrepancy
//! surfaces to operators via the logged error, not by discarding the
//! override.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kg_core::error::KgError;
use kg_core::ports::{GraphGateway, Result, VerificationStore};
use kg_core::principal::Principal;
use kg_core::tenant::{scope_clause, scope_write_clause};
use kg_core::types::{CriterionResult, QualityOverride, TenantId};
use serde_json::Value;
use uuid::Uuid;

pub struct GraphVerificationStore {
    gateway: Arc<dyn GraphGateway>,
}

impl GraphVerificationStore {
    pub fn new(gateway: Arc<dyn GraphGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl VerificationStore for GraphVerificationStore {
    async fn verify(&self, tenant: &TenantId, task_id: &str, criteria: Vec<CriterionResult>) -> Result<kg_core::dto::VerifyResponse> {
        let passed_count = criteria.iter().filter(|c| c.passed).count() as u32;
        let total = criteria.len() as u32;
        let passed = total > 0 && passed_count == total;
        let summary = format!("{passed_count}/{total} criteria passed");
        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        let criteria_json = serde_json::to_string(&criteria).map_err(|e| KgError::validation(e.to_string()))?;

        let query = format!(
            "MATCH (t:Task {{id: $task_id}}) WHERE ({task_scope}) \
             CREATE (v:VerificationResult {{id: $id, {write}, task_id: $task_id, passed: $passed, \
             timestamp: $timestamp, criteria_passed: $criteria_passed, criteria_total: $criteria_total, \
             summary: $summary, criteria_json: $criteria_json}}) \
             CREATE (t)-[:VERIFIED_BY]->(v) \
             RETURN t.id AS id",
            task_scope = scope_clause("t"),
            write = scope_write_clause("v"),
        );
        let mut params = HashMap::new();
        params.insert("task_id".into(), Value::String(task_id.to_string()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("id".into(), Value::String(id));
        params.insert("passed".into(), Value::Bool(passed));
        params.insert("timestamp".into(), Value::String(timestamp.to_rfc3339()));
        params.insert("criteria_passed".into(), Value::from(passed_count));
        params.insert("criteria_total".into(), Value::from(total));
        params.insert("summary".into(), Value::String(summary.clone()));
        params.insert("criteria_json".into(), Value::String(criteria_json));

        let rows = self.gateway.execute(&query, params).await?;
        if rows.is_empty() {
            return Err(KgError::not_found(format!("task {task_id}")));
        }

        Ok(kg_core::dto::VerifyResponse { task_id: task_id.to_string(), passed, timestamp, criteria, summary })
    }

    async fn override_verification(
        &self,
        tenant: &TenantId,
        principal: &Principal,
        req: kg_core::dto::OverrideRequest,
    ) -> Result<QualityOverride> {
        principal.require_override_eligible()?;

        let id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();

        let create_query = format!(
            "MATCH (t:Task {{id: $task_id}}) WHERE ({task_scope}) \
             MERGE (u:User {{id: $user_id}}) ON CREATE SET {user_write} \
             CREATE (o:QualityOverride {{id: $id, {override_write}, task_id: $task_id, \
             user_id: $user_id, reason: $reason, timestamp: $timestamp}}) \
             CREATE (t)-[:OVERRIDDEN_BY]->(o) \
             CREATE (u)-[:PERFORMED_OVERRIDE]->(o) \
             RETURN t.id AS id",
            task_scope = scope_clause("t"),
            user_write = scope_write_clause("u"),
            override_write = scope_write_clause("o"),
        );
        let mut params = HashMap::new();
        params.insert("task_id".into(), Value::String(req.task_id.clone()));
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        params.insert("user_id".into(), Value::String(principal.actor_id.clone()));
        params.insert("id".into(), Value::String(id.clone()));
        params.insert("reason".into(), Value::String(req.reason.clone()));
        params.insert("timestamp".into(), Value::String(timestamp.to_rfc3339()));

        let rows = self.gateway.execute(&create_query, params).await?;
        if rows.is_empty() {
            return Err(KgError::not_found(format!("task {}", req.task_id)));
        }

        let override_record = QualityOverride {
            id,
            task_id: req.task_id.clone(),
            user_id: principal.actor_id.clone(),
            reason: req.reason,
            timestamp,
            graph_id: tenant.as_str().to_string(),
        };

        let mutate_query = format!(
            "MATCH (t:Task {{id: $task_id}}) WHERE ({}) \
             SET t.status = 'complete', t.completed_at = $timestamp, t.quality_override = true",
            scope_clause("t")
        );
        let mut mutate_params = HashMap::new();
        mutate_params.insert("task_id".into(), Value::String(req.task_id.clone()));
        mutate_params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        mutate_params.insert("timestamp".into(), Value::String(timestamp.to_rfc3339()));

        if let Err(e) = self.gateway.execute(&mutate_query, mutate_params).await {
            tracing::error!(
                task_id = %req.task_id, override_id = %override_record.id, error = %e,
                "task status mutation failed after override was recorded — override record is authoritative"
            );
        }

        Ok(override_record)
    }
}
