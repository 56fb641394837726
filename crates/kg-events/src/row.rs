//! Row→`Event` mapping for this crate's own queries — each adapter crate
//! owns the mapping for the rows it issues (§9, mirrors
//! `kg-context::mappers` and `kg-graph::reconciler::CandidateNode`).

use chrono::{DateTime, Utc};
use kg_core::graph_value::{GraphRow, GraphValue};
use kg_core::types::{Event, Impact};

fn string_list(row: &GraphRow, key: &str) -> Vec<String> {
    match row.get(key) {
        GraphValue::List(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

pub fn row_to_event(row: &GraphRow) -> Event {
    Event {
        id: row.get_string("id").unwrap_or_default(),
        user_id: row.get_string("user_id").unwrap_or_default(),
        agent_id: row.get_string("agent_id"),
        project_id: row.get_string("project_id").unwrap_or_default(),
        timestamp: row
            .get_string("timestamp")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unknown_impact_defaults_low() {
        let mut m = HashMap::new();
        m.insert("id".to_string(), GraphValue::Str("evt_1".into()));
        let row = GraphRow(m);
        let event = row_to_event(&row);
        assert_eq!(event.impact, Impact::Low);
    }
}
