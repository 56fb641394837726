//! Core domain types for the knowledge graph service.
//! These are pure value types — no graph-driver dependency.

// Several enums intentionally use `from_str() -> Option<Self>` instead of
// `FromStr` because they return None for unknown values rather than an error.
#![allow(clippy::should_implement_trait)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant discriminator — the sole isolation boundary (see the GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The sibling tenant archived duplicates are moved into, e.g.
    /// `acme_archive_duplicates_20260727`.
    pub fn archive_namespace(&self, today: DateTime<Utc>) -> String {
        format!("{}_archive_duplicates_{}", self.0, today.format("%Y%m%d"))
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpicStatus {
    Active,
    Paused,
    Complete,
}

impl EpicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Complete => "complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl std::fmt::Display for EpicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadmapLane {
    Now,
    Next,
    Later,
    Done,
    Dropped,
}

impl RoadmapLane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Next => "next",
            Self::Later => "later",
            Self::Done => "done",
            Self::Dropped => "dropped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "now" => Some(Self::Now),
            "next" => Some(Self::Next),
            "later" => Some(Self::Later),
            "done" => Some(Self::Done),
            "dropped" => Some(Self::Dropped),
            _ => None,
        }
    }

    pub fn is_retired(&self) -> bool {
        matches!(self, Self::Done | Self::Dropped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Blocked,
    Complete,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Complete => "complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "blocked" => Some(Self::Blocked),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Severity ordering for Gotchas: `critical < high < medium < low` per the
/// Context Synthesizer's enrichment-phase sort (most severe first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlqStatus {
    Pending,
    Retrying,
    Resolved,
    Abandoned,
}

impl DlqStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Retrying => "retrying",
            Self::Resolved => "resolved",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Abandoned)
    }
}

impl std::fmt::Display for DlqStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship kind assigned to a semantic-search hit by score (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchRelationshipKind {
    DuplicateOf,
    HighlyRelatedTo,
    RelatedTo,
    LooselyRelatedTo,
}

impl SearchRelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateOf => "DUPLICATE_OF",
            Self::HighlyRelatedTo => "HIGHLY_RELATED_TO",
            Self::RelatedTo => "RELATED_TO",
            Self::LooselyRelatedTo => "LOOSELY_RELATED_TO",
        }
    }
}

// ── Entities ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,
    pub epic_id: String,
    pub title: String,
    pub goal: Option<String>,
    pub vision: Option<String>,
    pub status: EpicStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default)]
    pub in_scope: Vec<String>,
    #[serde(default)]
    pub out_of_scope: Vec<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub roadmap_status: Option<String>,
    pub roadmap_lane: Option<RoadmapLane>,
}

impl Epic {
    pub fn is_retired(&self) -> bool {
        self.status == EpicStatus::Complete
            && self.roadmap_lane.map(|l| l.is_retired()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub title: String,
    pub epic_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u8,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub sprint_id: String,
    pub epic_id: String,
    pub status: TaskStatus,
    pub blocked_reason: Option<String>,
    pub owner: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub quality_override: bool,
}

/// Long-form document types (ADR/PRD/Charter/Principle/ContextModule) share
/// one shape — they differ only by graph label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DocumentLabel {
    Adr,
    Prd,
    Charter,
    Principle,
    ContextModule,
}

impl DocumentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adr => "ADR",
            Self::Prd => "PRD",
            Self::Charter => "Charter",
            Self::Principle => "Principle",
            Self::ContextModule => "ContextModule",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub label: DocumentLabel,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub title: String,
    pub confidence: Confidence,
    pub confidence_score: u8,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gotcha {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub confidence_score: u8,
    pub symptom: Option<String>,
    pub cause: Option<String>,
    pub solution: Option<String>,
    #[serde(default)]
    pub encounters: u32,
    #[serde(default)]
    pub resolutions: u32,
}

impl Gotcha {
    pub fn is_consistent(&self) -> bool {
        self.encounters >= self.resolutions
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub agent_id: Option<String>,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub files: Vec<String>,
    pub impact: Impact,
    pub branch: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub shared: bool,
    pub commit_hash: Option<String>,
    pub pressure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub id: String,
    pub graph_id: String,
    pub original_event: serde_json::Value,
    pub failure_reason: String,
    pub failed_at: DateTime<Utc>,
    pub retry_count: u32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub status: DlqStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionResult {
    pub id: String,
    pub description: String,
    pub passed: bool,
    pub details: Option<String>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub id: String,
    pub task_id: String,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
    pub criteria_passed: u32,
    pub criteria_total: u32,
    pub summary: String,
}

impl VerificationResult {
    pub fn is_consistent(&self) -> bool {
        self.passed == (self.criteria_passed == self.criteria_total)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityOverride {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub graph_id: String,
}

/// One typed relationship edge, as exposed by `ListRelationships` (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub rel_type: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epic_retired_requires_both_conditions() {
        let mut e = Epic {
            id: "e005".into(),
            epic_id: "e005".into(),
            title: "x".into(),
            goal: None,
            vision: None,
            status: EpicStatus::Complete,
            progress: 100,
            success_criteria: vec![],
            in_scope: vec![],
            out_of_scope: vec![],
            created_by: None,
            updated_by: None,
            created_at: None,
            updated_at: None,
            roadmap_status: None,
            roadmap_lane: Some(RoadmapLane::Now),
        };
        assert!(!e.is_retired());
        e.roadmap_lane = Some(RoadmapLane::Dropped);
        assert!(e.is_retired());
    }

    #[test]
    fn gotcha_consistency_check() {
        let g = Gotcha {
            id: "g1".into(),
            title: "x".into(),
            severity: Severity::High,
            confidence_score: 80,
            symptom: None,
            cause: None,
            solution: None,
            encounters: 3,
            resolutions: 4,
        };
        assert!(!g.is_consistent());
    }

    #[test]
    fn severity_orders_most_severe_first() {
        let mut v = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        v.sort();
        assert_eq!(
            v,
            vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
        );
    }

    #[test]
    fn archive_namespace_format() {
        let t = TenantId::new("acme");
        let day = DateTime::parse_from_rfc3339("2026-07-27T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(t.archive_namespace(day), "acme_archive_duplicates_20260727");
    }
}
