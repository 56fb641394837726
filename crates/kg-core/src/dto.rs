//! Named request/response structs per operation (§9: "model as explicit
//! named structs per endpoint" rather than large anonymous object fields).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::*;

// ── C3 Node Repository ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpsertResult {
    pub id: String,
    pub created: bool,
    pub nodes_created: u32,
    pub rels_created: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ListNodesFilter {
    pub label: Option<String>,
    pub status: Option<String>,
    pub tags: Vec<String>,
    pub limit: u32,
    pub offset: u32,
}

impl ListNodesFilter {
    /// Clamps `limit` to `[1,100]` and `offset` to `≥0`, per §4.3.
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, 100);
        self
    }
}

// ── C4 Duplicate Reconciler ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroupDetail {
    pub entity_type: String,
    pub canonical_id: String,
    pub survivor_id: String,
    pub orphan_id: Vec<String>,
    pub relationships_transferred: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MergeReport {
    pub merged: u32,
    pub details: Vec<DuplicateGroupDetail>,
}

// ── C5 Embedding & Semantic Search ────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    Query,
    Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub node_id: String,
    pub label: String,
    pub score: f32,
    pub relationship_type: SearchRelationshipKind,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub limit: u32,
    pub label: Option<String>,
    pub status: Option<String>,
    pub min_score: f32,
}

// ── C6 Context Synthesizer ────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionStartRequest {
    pub user_id: String,
    pub sprint_id: Option<String>,
    pub event_limit: u32,
    pub team_event_days: u32,
}

impl Default for SessionStartRequest {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            sprint_id: None,
            event_limit: 25,
            team_event_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionMetadata {
    pub load_time_ms: u64,
    pub sprint_found: bool,
    pub task_count: u32,
    pub event_count: u32,
    pub token_estimate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CurrentTaskContext {
    pub task: Option<Task>,
    pub patterns: Vec<Pattern>,
    pub gotchas: Vec<Gotcha>,
    pub constraints: Vec<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActiveSprintContext {
    pub sprint: Option<Sprint>,
    pub epic: Option<Epic>,
    pub current_task: CurrentTaskContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CharterSummary {
    pub purpose: Option<String>,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionStartResponse {
    pub active_sprint: ActiveSprintContext,
    pub recent_events: Vec<Event>,
    pub charter: Option<CharterSummary>,
    pub team_activity: Vec<Event>,
    pub epic: Option<Epic>,
    pub metadata: SessionMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct StrategicContextRequest {
    pub tags: Vec<String>,
    pub top_k: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StrategicContextResponse {
    pub charter: Option<CharterSummary>,
    pub team_activity: Vec<Event>,
    pub patterns: Vec<Pattern>,
    pub gotchas: Vec<Gotcha>,
    pub decisions: Vec<Document>,
}

// ── C7 Event Stream ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub since: Option<String>,
    pub limit: u32,
    pub timeout_secs: u32,
    pub categories: Vec<String>,
    pub agent_id: Option<String>,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            since: None,
            limit: 50,
            timeout_secs: 30,
            categories: vec![],
            agent_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StreamResponse {
    pub events: Vec<Event>,
    pub has_more: bool,
    pub last_event_id: Option<String>,
    pub poll_duration_ms: u64,
}

// ── C8 Dead-Letter Queue ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqRetryOutcome {
    pub success: bool,
    pub status: DlqStatus,
    pub retry_count: u32,
    pub failure_reason: Option<String>,
    pub remaining_secs: Option<i64>,
}

// ── C9 Migration / Cleanup ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrationReport {
    pub migrated: u32,
    pub skipped: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CleanupReport {
    pub titles_fixed: u32,
    pub merge_report: Option<MergeReport>,
}

// ── C10 Verification & Override ───────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub task_id: String,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
    pub criteria: Vec<CriterionResult>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct OverrideRequest {
    pub task_id: String,
    pub reason: String,
}
