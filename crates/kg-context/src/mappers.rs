//! Manual row→struct mappers for the Context Synthesizer's read-only
//! queries. Columns are always explicitly aliased in the Cypher `RETURN`
//! clause (never a blind `RETURN n`), because the write path (`kg-graph`'s
//! `upsert_template`) stores timestamps under `createdAt`/`updatedAt` while
//! the domain types use `created_at`/`updated_at` — a generic
//! node-to-struct deserialize would silently drop them. Mirrors the
//! explicit extraction style of `kg-graph::reconciler::CandidateNode`.

use chrono::{DateTime, Utc};
use kg_core::graph_value::{GraphRow, GraphValue};
use kg_core::types::{
    Confidence, Document, DocumentLabel, Epic, EpicStatus, Event, Gotcha, Impact, Pattern,
    RoadmapLane, Sprint, Task, TaskStatus,
};

fn parse_ts(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn string_list(row: &GraphRow, key: &str) -> Vec<String> {
    match row.get(key) {
        GraphValue::List(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

pub fn row_to_sprint(row: &GraphRow) -> Sprint {
    Sprint {
        id: row.get_string("id").unwrap_or_default(),
        title: row.get_string("title").unwrap_or_default(),
        epic_id: row.get_string("epic_id").unwrap_or_default(),
        status: TaskStatus::from_str(&row.get_string("status").unwrap_or_default()).unwrap_or(TaskStatus::NotStarted),
        progress: row.get_i64("progress").clamp(0, 100) as u8,
        updated_at: parse_ts(row.get_string("updated_at")),
    }
}

pub fn row_to_epic(row: &GraphRow) -> Epic {
    Epic {
        id: row.get_string("id").unwrap_or_default(),
        epic_id: row.get_string("epic_id").unwrap_or_default(),
        title: row.get_string("title").unwrap_or_default(),
        goal: row.get_string("goal"),
        vision: row.get_string("vision"),
        status: EpicStatus::from_str(&row.get_string("status").unwrap_or_default()).unwrap_or(EpicStatus::Active),
        progress: row.get_i64("progress").clamp(0, 100) as u8,
        success_criteria: string_list(row, "success_criteria"),
        in_scope: string_list(row, "in_scope"),
        out_of_scope: string_list(row, "out_of_scope"),
        created_by: row.get_string("created_by"),
        updated_by: row.get_string("updated_by"),
        created_at: parse_ts(row.get_string("created_at")),
        updated_at: parse_ts(row.get_string("updated_at")),
        roadmap_status: row.get_string("roadmap_status"),
        roadmap_lane: row.get_string("roadmap_lane").as_deref().and_then(RoadmapLane::from_str),
    }
}

pub fn row_to_task(row: &GraphRow) -> Task {
    Task {
        id: row.get_string("id").unwrap_or_default(),
        title: row.get_string("title").unwrap_or_default(),
        sprint_id: row.get_string("sprint_id").unwrap_or_default(),
        epic_id: row.get_string("epic_id").unwrap_or_default(),
        status: TaskStatus::from_str(&row.get_string("status").unwrap_or_default()).unwrap_or(TaskStatus::NotStarted),
        blocked_reason: row.get_string("blocked_reason"),
        owner: row.get_string("owner"),
        completed_at: parse_ts(row.get_string("completed_at")),
        quality_override: row.get_bool("quality_override"),
    }
}

pub fn row_to_event(row: &GraphRow) -> Event {
    Event {
        id: row.get_string("id").unwrap_or_default(),
        user_id: row.get_string("user_id").unwrap_or_default(),
        agent_id: row.get_string("agent_id"),
        project_id: row.get_string("project_id").unwrap_or_default(),
        timestamp: parse_ts(row.get_string("timestamp")).unwrap_or_else(Utc::now),
        category: row.get_string("category").unwrap_or_default(),
        description: row.get_string("description").unwrap_or_default(),
        files: string_list(row, "files"),
        impact: match row.get_string("impact").as_deref() {
            Some("high") => Impact::High,
            Some("medium") => Impact::Medium,
            _ => Impact::Low,
        },
        branch: row.get_string("branch"),
        tags: string_list(row, "tags"),
        shared: row.get_bool("shared"),
        commit_hash: row.get_string("commit_hash"),
        pressure: row.get_string("pressure"),
    }
}

pub fn row_to_pattern(row: &GraphRow) -> Pattern {
    let score = row.get_i64("confidence_score").clamp(0, 100) as u8;
    Pattern {
        id: row.get_string("id").unwrap_or_default(),
        title: row.get_string("title").unwrap_or_default(),
        confidence: match row.get_string("confidence").as_deref() {
            Some("high") => Confidence::High,
            Some("medium") => Confidence::Medium,
            _ => Confidence::Low,
        },
        confidence_score: score,
        category: row.get_string("category"),
    }
}

pub fn row_to_gotcha(row: &GraphRow) -> Gotcha {
    Gotcha {
        id: row.get_string("id").unwrap_or_default(),
        title: row.get_string("title").unwrap_or_default(),
        severity: kg_core::types::Severity::from_str(&row.get_string("severity").unwrap_or_default())
            .unwrap_or(kg_core::types::Severity::Low),
        confidence_score: row.get_i64("confidence_score").clamp(0, 100) as u8,
        symptom: row.get_string("symptom"),
        cause: row.get_string("cause"),
        solution: row.get_string("solution"),
        encounters: row.get_i64("encounters").max(0) as u32,
        resolutions: row.get_i64("resolutions").max(0) as u32,
    }
}

pub fn row_to_document(row: &GraphRow, label: DocumentLabel) -> Document {
    Document {
        id: row.get_string("id").unwrap_or_default(),
        label,
        title: row.get_string("title").unwrap_or_default(),
        content: row.get_string("content"),
        summary: row.get_string("summary"),
        tags: string_list(row, "tags"),
        category: row.get_string("category"),
        created_at: parse_ts(row.get_string("created_at")),
        updated_at: parse_ts(row.get_string("updated_at")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn sprint_mapping_defaults_unknown_status() {
        let mut m = HashMap::new();
        m.insert("id".to_string(), GraphValue::Str("e005_s01".into()));
        m.insert("title".to_string(), GraphValue::Str("Sprint one".into()));
        let row = GraphRow(m);
        let sprint = row_to_sprint(&row);
        assert_eq!(sprint.id, "e005_s01");
        assert_eq!(sprint.status, TaskStatus::NotStarted);
    }

    #[test]
    fn gotcha_mapping_clamps_nonnegative_counts() {
        let mut m = HashMap::new();
        m.insert("encounters".to_string(), GraphValue::Int(3));
        m.insert("resolutions".to_string(), GraphValue::Int(1));
        let row = GraphRow(m);
        let g = row_to_gotcha(&row);
        assert_eq!(g.encounters, 3);
        assert_eq!(g.resolutions, 1);
    }
}
