//! C9 — Migration / Cleanup Runner. Backfill migrations and
//! malformed-title/duplicate cleanup, both dry-run-capable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kg_core::canonical::{
    extract_clean_title, is_malformed_title, require_cleanup_confirmation, synthesize_task_title_fallback,
};
use kg_core::dto::{CleanupReport, MigrationReport};
use kg_core::error::KgError;
use kg_core::ports::{DuplicateReconciler, GraphGateway, MigrationRunner, Result};
use kg_core::types::TenantId;
use serde_json::Value;

pub struct GraphMigrationRunner {
    gateway: Arc<dyn GraphGateway>,
    reconciler: Arc<dyn DuplicateReconciler>,
}

impl GraphMigrationRunner {
    pub fn new(gateway: Arc<dyn GraphGateway>, reconciler: Arc<dyn DuplicateReconciler>) -> Self {
        Self { gateway, reconciler }
    }

    async fn backfill_missing_property(
        &self,
        tenant: &TenantId,
        label: &str,
        missing_prop: &str,
        source_prop: Option<&str>,
        default_value: Option<&str>,
        dry_run: bool,
    ) -> Result<MigrationReport> {
        let find_query = format!(
            "MATCH (n:{label}) WHERE ({}) RETURN n.id AS id, n.{missing_prop} AS current_value, n.{source} AS source_value",
            kg_core::tenant::scope_clause("n"),
            source = source_prop.unwrap_or(missing_prop),
        );
        let mut params = HashMap::new();
        params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        let rows = self.gateway.execute(&find_query, params).await?;

        let mut report = MigrationReport::default();
        for row in rows {
            // Already backfilled — re-running the same migration is a no-op,
            // counted as skipped rather than re-migrated (idempotent apply).
            if row.get_string("current_value").is_some() {
                report.skipped += 1;
                continue;
            }
            let id = row.get_string("id").unwrap_or_default();
            let value = row
                .get_string("source_value")
                .or_else(|| default_value.map(|s| s.to_string()));
            let Some(value) = value else {
                report.skipped += 1;
                continue;
            };
            if dry_run {
                report.migrated += 1;
                continue;
            }
            let set_query = format!(
                "MATCH (n:{label} {{id: $id}}) WHERE ({}) SET n.{missing_prop} = $value",
                kg_core::tenant::scope_clause("n")
            );
            let mut params = HashMap::new();
            params.insert("id".into(), Value::String(id));
            params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
            params.insert("value".into(), Value::String(value));
            match self.gateway.execute(&set_query, params).await {
                Ok(_) => report.migrated += 1,
                Err(_) => report.errors += 1,
            }
        }
        Ok(report)
    }
}

#[async_trait]
impl MigrationRunner for GraphMigrationRunner {
    async fn run_backfill(&self, tenant: &TenantId, migration_id: &str, dry_run: bool) -> Result<MigrationReport> {
        match migration_id {
            "M009" => {
                self.backfill_missing_property(tenant, "Epic", "roadmap_status", None, Some("now"), dry_run)
                    .await
            }
            "M010" => {
                self.backfill_missing_property(tenant, "Epic", "graph_id", Some("graphId"), None, dry_run)
                    .await
            }
            "M011" => {
                let mut sprint_report = self
                    .backfill_missing_property(tenant, "Sprint", "graph_id", Some("graphId"), None, dry_run)
                    .await?;
                let task_report = self
                    .backfill_missing_property(tenant, "Task", "graph_id", Some("graphId"), None, dry_run)
                    .await?;
                sprint_report.migrated += task_report.migrated;
                sprint_report.skipped += task_report.skipped;
                sprint_report.errors += task_report.errors;
                Ok(sprint_report)
            }
            "M013" => {
                self.backfill_missing_property(tenant, "Sprint", "status", None, Some("active"), dry_run)
                    .await
            }
            "M014" => {
                self.backfill_missing_property(tenant, "Sprint", "content", Some("goal"), None, dry_run)
                    .await
            }
            other => Err(KgError::validation(format!("unknown migration id: {other}"))),
        }
    }

    async fn run_cleanup(
        &self,
        tenant: &TenantId,
        dry_run: bool,
        also_dedupe: bool,
        confirm: Option<&str>,
    ) -> Result<CleanupReport> {
        require_cleanup_confirmation(dry_run, confirm)?;
        let mut fixed = 0u32;

        for label in ["Sprint", "Task", "Epic"] {
            let query = format!(
                "MATCH (n:{label}) WHERE ({}) RETURN n.id AS id, n.title AS title",
                kg_core::tenant::scope_clause("n")
            );
            let mut params = HashMap::new();
            params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
            let rows = self.gateway.execute(&query, params).await?;

            for row in rows {
                let id = row.get_string("id").unwrap_or_default();
                let Some(title) = row.get_string("title") else { continue };
                if !is_malformed_title(&title) {
                    continue;
                }
                let new_title = extract_clean_title(&title)
                    .or_else(|| synthesize_task_title_fallback(&id))
                    .unwrap_or_else(|| format!("Untitled {label}"));

                if dry_run {
                    fixed += 1;
                    continue;
                }
                let set_query = format!(
                    "MATCH (n:{label} {{id: $id}}) WHERE ({}) SET n.title = $title, n.name = $title",
                    kg_core::tenant::scope_clause("n")
                );
                let mut params = HashMap::new();
                params.insert("id".into(), Value::String(id));
                params.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
                params.insert("title".into(), Value::String(new_title));
                self.gateway.execute(&set_query, params).await?;
                fixed += 1;
            }
        }

        let merge_report = if also_dedupe {
            Some(self.reconciler.reconcile(tenant, dry_run).await?)
        } else {
            None
        };

        Ok(CleanupReport {
            titles_fixed: fixed,
            merge_report,
        })
    }
}
