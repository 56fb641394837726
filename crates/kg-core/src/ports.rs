//! Storage and collaborator port traits — implemented by the `kg-graph`,
//! `kg-search`, `kg-context`, `kg-events`, `kg-dlq`, and `kg-verify` crates.
//! Core logic and the composition root depend only on these traits, never
//! on a graph-driver or HTTP client type directly.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::{
    dto::*,
    error::KgError,
    graph_value::GraphRow,
    principal::Principal,
    types::*,
};

pub type Result<T> = std::result::Result<T, KgError>;

/// C1 — owns the connection pool, executes parametric queries, exposes
/// transactional read/write sessions.
#[async_trait]
pub trait GraphGateway: Send + Sync {
    /// Single auto-committed query. Values come back normalized per
    /// `GraphValue`'s rules; there is no other path to raw driver rows.
    async fn execute(&self, query: &str, params: HashMap<String, serde_json::Value>) -> Result<Vec<GraphRow>>;

    /// Liveness probe used by health endpoints.
    async fn verify_connectivity(&self) -> Result<()>;
}

/// C3 — typed upsert (MERGE-on-identity), read, list-with-filters,
/// relationship create/list.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn upsert_epic(&self, tenant: &TenantId, epic: &Epic, principal: &Principal) -> Result<UpsertResult>;
    async fn upsert_sprint(&self, tenant: &TenantId, sprint: &Sprint, principal: &Principal) -> Result<UpsertResult>;
    async fn upsert_task(&self, tenant: &TenantId, task: &Task, principal: &Principal) -> Result<UpsertResult>;
    async fn upsert_document(&self, tenant: &TenantId, doc: &Document, principal: &Principal) -> Result<UpsertResult>;

    /// Returns `None` on absence — callers that require existence convert
    /// that to `NotFound` themselves (§4.3).
    async fn get_node(&self, tenant: &TenantId, id: &str) -> Result<Option<GraphRow>>;

    async fn list_nodes(&self, tenant: &TenantId, filter: ListNodesFilter) -> Result<Vec<GraphRow>>;

    async fn create_relationship(
        &self,
        tenant: &TenantId,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        props: HashMap<String, serde_json::Value>,
    ) -> Result<bool>;

    async fn list_relationships(
        &self,
        tenant: &TenantId,
        node_id: &str,
        direction: Direction,
    ) -> Result<Vec<RelationshipEdge>>;
}

/// C4 — finds structural duplicates, picks a survivor, migrates edges,
/// archives losers. `dry_run` never mutates the graph.
#[async_trait]
pub trait DuplicateReconciler: Send + Sync {
    async fn reconcile(&self, tenant: &TenantId, dry_run: bool) -> Result<MergeReport>;
}

/// C5 — the (excluded) embedding provider, behind a narrow trait so
/// `kg-search` never depends on a concrete HTTP client.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, texts: &[String], kind: EmbeddingKind) -> Result<Vec<Vec<f32>>>;
}

/// C5 — vector-index top-K search with score→relationship-kind mapping.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    async fn search(&self, tenant: &TenantId, params: SearchParams) -> Result<Vec<SearchHit>>;
}

/// C6 — the session-start and strategic-context fan-out/fan-in engine.
#[async_trait]
pub trait ContextSynthesizer: Send + Sync {
    async fn session_start(&self, tenant: &TenantId, req: SessionStartRequest) -> Result<SessionStartResponse>;
    async fn strategic_context(&self, tenant: &TenantId, req: StrategicContextRequest) -> Result<StrategicContextResponse>;
}

/// C7 — append-only event log with cursor-based tailing and long-poll.
#[async_trait]
pub trait EventStream: Send + Sync {
    async fn append(&self, tenant: &TenantId, event: Event) -> Result<()>;
    async fn stream(&self, tenant: &TenantId, req: StreamRequest) -> Result<StreamResponse>;
}

/// C8 — dead-letter state machine, exponential retry-after schedule.
#[async_trait]
pub trait DeadLetterQueue: Send + Sync {
    async fn enqueue(&self, tenant: &TenantId, original_event: serde_json::Value, failure_reason: String) -> Result<DeadLetterEntry>;
    async fn get(&self, tenant: &TenantId, id: &str) -> Result<Option<DeadLetterEntry>>;
    async fn list(&self, tenant: &TenantId, status: Option<DlqStatus>, limit: u32) -> Result<Vec<DeadLetterEntry>>;
    async fn retry(&self, tenant: &TenantId, id: &str, now: chrono::DateTime<chrono::Utc>) -> Result<DlqRetryOutcome>;
}

/// C9 — backfill migrations and malformed-title/duplicate cleanup, both
/// dry-run-capable.
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    async fn run_backfill(&self, tenant: &TenantId, migration_id: &str, dry_run: bool) -> Result<MigrationReport>;

    /// `confirm` must equal [`crate::canonical::CLEANUP_CONFIRMATION_TOKEN`]
    /// whenever `dry_run` is `false` — enforced by
    /// [`crate::canonical::require_cleanup_confirmation`] before any mutation.
    async fn run_cleanup(
        &self,
        tenant: &TenantId,
        dry_run: bool,
        also_dedupe: bool,
        confirm: Option<&str>,
    ) -> Result<CleanupReport>;
}

/// C10 — verification-outcome recording and the human-only override gate.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn verify(&self, tenant: &TenantId, task_id: &str, criteria: Vec<CriterionResult>) -> Result<VerifyResponse>;
    async fn override_verification(
        &self,
        tenant: &TenantId,
        principal: &Principal,
        req: OverrideRequest,
    ) -> Result<QualityOverride>;
}
