//! End-to-end scenario tests against an in-memory fake `GraphGateway`,
//! per the two seed scenarios assigned to this crate: S1 (dedup with
//! edge migration) and S6 (migration M014 content standardization).
//! Exercises `GraphDuplicateReconciler`/`GraphMigrationRunner` through
//! the port trait only — no live Neo4j involved.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kg_core::graph_value::{GraphRow, GraphValue};
use kg_core::ports::{DuplicateReconciler, GraphGateway, MigrationRunner, Result};
use kg_core::types::TenantId;
use kg_graph::{GraphDuplicateReconciler, GraphMigrationRunner};
use serde_json::Value;

#[derive(Clone)]
struct FakeNode {
    label: String,
    props: HashMap<String, GraphValue>,
}

#[derive(Clone)]
struct FakeEdge {
    from: String,
    to: String,
    rel_type: String,
}

#[derive(Default)]
struct FakeState {
    nodes: HashMap<String, FakeNode>,
    edges: Vec<FakeEdge>,
}

struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    fn seed_node(&self, eid: &str, label: &str, props: &[(&str, GraphValue)]) {
        let mut state = self.state.lock().unwrap();
        state.nodes.insert(
            eid.to_string(),
            FakeNode {
                label: label.to_string(),
                props: props.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            },
        );
    }

    fn seed_edge(&self, from: &str, to: &str, rel_type: &str) {
        let mut state = self.state.lock().unwrap();
        state.edges.push(FakeEdge {
            from: from.to_string(),
            to: to.to_string(),
            rel_type: rel_type.to_string(),
        });
    }

    fn prop(&self, eid: &str, key: &str) -> Option<GraphValue> {
        self.state.lock().unwrap().nodes.get(eid).and_then(|n| n.props.get(key).cloned())
    }

    fn edge_count(&self) -> usize {
        self.state.lock().unwrap().edges.len()
    }
}

/// Pulls the identifier immediately following `marker`, stopping at the
/// first non `[A-Za-z0-9_]` character. Every query this fake interprets
/// was built from a fixed `format!` template, so this is exact, not
/// a general Cypher parser.
fn ident_after(s: &str, marker: &str) -> Option<String> {
    let idx = s.find(marker)? + marker.len();
    let rest = &s[idx..];
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

fn json_to_gv(v: &Value) -> GraphValue {
    match v {
        Value::Null => GraphValue::Null,
        Value::Bool(b) => GraphValue::Bool(*b),
        Value::Number(n) => n.as_i64().map(GraphValue::Int).unwrap_or_else(|| GraphValue::Float(n.as_f64().unwrap_or(0.0))),
        Value::String(s) => GraphValue::Str(s.clone()),
        Value::Array(a) => GraphValue::List(a.iter().map(json_to_gv).collect()),
        Value::Object(m) => GraphValue::Map(m.iter().map(|(k, v)| (k.clone(), json_to_gv(v))).collect()),
    }
}

fn row(pairs: Vec<(&str, GraphValue)>) -> GraphRow {
    GraphRow(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

#[async_trait]
impl GraphGateway for FakeGateway {
    async fn execute(&self, query: &str, params: HashMap<String, Value>) -> Result<Vec<GraphRow>> {
        // 1. Reconciler candidate scan.
        if query.contains("OPTIONAL MATCH (n)-[r]-()") {
            let label = ident_after(query, "MATCH (n:").unwrap_or_default();
            let state = self.state.lock().unwrap();
            let mut out = Vec::new();
            for (eid, node) in state.nodes.iter() {
                if node.label != label || node.props.contains_key("archived_at") {
                    continue;
                }
                let rel_count = state.edges.iter().filter(|e| &e.from == eid || &e.to == eid).count() as i64;
                let prop_count = node.props.values().filter(|v| !v.is_null()).count() as i64;
                out.push(row(vec![
                    ("eid", GraphValue::Str(eid.clone())),
                    ("id", node.props.get("id").cloned().unwrap_or(GraphValue::Null)),
                    ("sprint_id", node.props.get("sprint_id").cloned().unwrap_or(GraphValue::Null)),
                    ("epic_id", node.props.get("epic_id").cloned().unwrap_or(GraphValue::Null)),
                    ("title", node.props.get("title").cloned().unwrap_or(GraphValue::Null)),
                    ("ts", node.props.get("ts").cloned().unwrap_or(GraphValue::Null)),
                    ("rel_count", GraphValue::Int(rel_count)),
                    ("prop_count", GraphValue::Int(prop_count)),
                ]));
            }
            return Ok(out);
        }

        // 2. Property merge: fetch both property bags for the Rust-side diff.
        if query.contains("AS survivor_props") {
            let survivor_eid = params.get("survivor_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let loser_eid = params.get("loser_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let state = self.state.lock().unwrap();
            let survivor_props = state.nodes.get(&survivor_eid).map(|n| n.props.clone()).unwrap_or_default();
            let loser_props = state.nodes.get(&loser_eid).map(|n| n.props.clone()).unwrap_or_default();
            return Ok(vec![row(vec![
                ("survivor_props", GraphValue::Map(survivor_props)),
                ("loser_props", GraphValue::Map(loser_props)),
            ])]);
        }

        // 3. Property merge: apply the computed diff.
        if query.contains("SET s += $props") {
            let survivor_eid = params.get("survivor_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let props = params.get("props").and_then(|v| v.as_object()).cloned().unwrap_or_default();
            let mut state = self.state.lock().unwrap();
            if let Some(node) = state.nodes.get_mut(&survivor_eid) {
                for (k, v) in props {
                    node.props.insert(k, json_to_gv(&v));
                }
            }
            return Ok(vec![]);
        }

        // 4. Incoming-edge type discovery.
        if query.contains("DISTINCT type(r)") && query.contains("[r]->(l:") {
            let loser_eid = params.get("loser_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let state = self.state.lock().unwrap();
            let mut seen = std::collections::HashSet::new();
            let mut out = Vec::new();
            for e in state.edges.iter() {
                if e.to == loser_eid && seen.insert(e.rel_type.clone()) {
                    out.push(row(vec![("rtype", GraphValue::Str(e.rel_type.clone()))]));
                }
            }
            return Ok(out);
        }

        // 5. Outgoing-edge type discovery.
        if query.contains("DISTINCT type(r)") {
            let loser_eid = params.get("loser_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let state = self.state.lock().unwrap();
            let mut seen = std::collections::HashSet::new();
            let mut out = Vec::new();
            for e in state.edges.iter() {
                if e.from == loser_eid && seen.insert(e.rel_type.clone()) {
                    out.push(row(vec![("rtype", GraphValue::Str(e.rel_type.clone()))]));
                }
            }
            return Ok(out);
        }

        // 6. Incoming-edge transfer for one relationship type.
        if query.contains("CREATE (x)-[r2:") {
            let survivor_eid = params.get("survivor_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let loser_eid = params.get("loser_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let mut state = self.state.lock().unwrap();
            let mut n = 0i64;
            for e in state.edges.iter_mut() {
                if e.to == loser_eid {
                    e.to = survivor_eid.clone();
                    n += 1;
                }
            }
            return Ok(vec![row(vec![("n", GraphValue::Int(n))])]);
        }

        // 7. Outgoing-edge transfer for one relationship type.
        if query.contains("CREATE (s)-[r2:") {
            let survivor_eid = params.get("survivor_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let loser_eid = params.get("loser_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let mut state = self.state.lock().unwrap();
            let mut n = 0i64;
            for e in state.edges.iter_mut() {
                if e.from == loser_eid {
                    e.from = survivor_eid.clone();
                    n += 1;
                }
            }
            return Ok(vec![row(vec![("n", GraphValue::Int(n))])]);
        }

        // 5. Archival.
        if query.contains("archived_reason") {
            let loser_eid = params.get("loser_eid").and_then(|v| v.as_str()).unwrap().to_string();
            let mut state = self.state.lock().unwrap();
            let node = state.nodes.get_mut(&loser_eid).unwrap();
            for (k, v) in &params {
                if k == "loser_eid" {
                    continue;
                }
                let mapped = match k.as_str() {
                    "archive_tenant" => Some("graph_id"),
                    "tenant" => Some("archived_from"),
                    "now" => Some("archived_at"),
                    "survivor_eid" => Some("kept_element_id"),
                    _ => None,
                };
                if let Some(dest) = mapped {
                    node.props.insert(dest.to_string(), json_to_gv(v));
                }
            }
            node.props.insert("graphId".into(), node.props.get("graph_id").cloned().unwrap_or(GraphValue::Null));
            node.props.insert("archived_reason".into(), GraphValue::Str("duplicate_cleanup".into()));
            return Ok(vec![]);
        }

        // 6. Backfill: find rows and their current/source property values.
        if query.contains("AS source_value") {
            let label = ident_after(query, "MATCH (n:").unwrap_or_default();
            let missing_prop = ident_after(query, "RETURN n.id AS id, n.").unwrap_or_default();
            let source = ident_after(query, "AS current_value, n.").unwrap_or_default();
            let state = self.state.lock().unwrap();
            let mut out = Vec::new();
            for node in state.nodes.values() {
                if node.label != label {
                    continue;
                }
                out.push(row(vec![
                    ("id", node.props.get("id").cloned().unwrap_or(GraphValue::Null)),
                    ("current_value", node.props.get(&missing_prop).cloned().unwrap_or(GraphValue::Null)),
                    ("source_value", node.props.get(&source).cloned().unwrap_or(GraphValue::Null)),
                ]));
            }
            return Ok(out);
        }

        // 7. Backfill: apply a single property set.
        if params.contains_key("value") {
            let missing_prop = ident_after(query, "SET n.").unwrap_or_default();
            let id = params.get("id").and_then(|v| v.as_str()).unwrap().to_string();
            let value = params.get("value").cloned().unwrap_or(Value::Null);
            let mut state = self.state.lock().unwrap();
            if let Some(node) = state.nodes.values_mut().find(|n| n.props.get("id").and_then(|v| v.as_str()) == Some(id.as_str())) {
                node.props.insert(missing_prop, json_to_gv(&value));
            }
            return Ok(vec![]);
        }

        // 8. Cleanup: find malformed-title candidates.
        if query.contains("RETURN n.id AS id, n.title AS title") {
            let label = ident_after(query, "MATCH (n:").unwrap_or_default();
            let state = self.state.lock().unwrap();
            let mut out = Vec::new();
            for node in state.nodes.values() {
                if node.label != label {
                    continue;
                }
                out.push(row(vec![
                    ("id", node.props.get("id").cloned().unwrap_or(GraphValue::Null)),
                    ("title", node.props.get("title").cloned().unwrap_or(GraphValue::Null)),
                ]));
            }
            return Ok(out);
        }

        // 9. Cleanup: apply a cleaned title.
        if query.contains("n.title = $title, n.name = $title") {
            let id = params.get("id").and_then(|v| v.as_str()).unwrap().to_string();
            let title = params.get("title").and_then(|v| v.as_str()).unwrap().to_string();
            let mut state = self.state.lock().unwrap();
            if let Some(node) = state.nodes.values_mut().find(|n| n.props.get("id").and_then(|v| v.as_str()) == Some(id.as_str())) {
                node.props.insert("title".into(), GraphValue::Str(title.clone()));
                node.props.insert("name".into(), GraphValue::Str(title));
            }
            return Ok(vec![]);
        }

        Ok(vec![])
    }

    async fn verify_connectivity(&self) -> Result<()> {
        Ok(())
    }
}

fn tenant() -> TenantId {
    TenantId::new("acme")
}

#[tokio::test]
async fn s1_deduplicate_with_edge_migration() {
    let gw = Arc::new(FakeGateway::new());

    gw.seed_node(
        "survivor-elem",
        "Sprint",
        &[
            ("id", GraphValue::Str("e005_s01".into())),
            ("epic_id", GraphValue::Str("e005".into())),
            ("status", GraphValue::Str("in_progress".into())),
            ("ts", GraphValue::Str("2026-07-20T00:00:00Z".into())),
        ],
    );
    gw.seed_node(
        "loser-elem",
        "Sprint",
        &[
            ("id", GraphValue::Str("e005_s01".into())),
            ("content", GraphValue::Str("Sprint body".into())),
            ("summary", GraphValue::Str("S".into())),
            ("ts", GraphValue::Str("2026-07-10T00:00:00Z".into())),
        ],
    );
    gw.seed_edge("survivor-elem", "task-X", "CONTAINS");
    gw.seed_edge("epic-E", "loser-elem", "BELONGS_TO");

    let reconciler = GraphDuplicateReconciler::new(gw.clone());
    let report = reconciler.reconcile(&tenant(), false).await.unwrap();

    assert_eq!(report.merged, 1);
    let detail = &report.details[0];
    assert_eq!(detail.entity_type, "Sprint");
    assert_eq!(detail.canonical_id, "e005_s01");
    assert_eq!(detail.survivor_id, "e005_s01");
    assert_eq!(detail.orphan_id, vec!["loser-elem".to_string()]);
    assert_eq!(detail.relationships_transferred, 1);

    assert_eq!(gw.prop("survivor-elem", "epic_id").unwrap(), GraphValue::Str("e005".into()));
    assert_eq!(gw.prop("survivor-elem", "status").unwrap(), GraphValue::Str("in_progress".into()));
    assert_eq!(gw.prop("survivor-elem", "content").unwrap(), GraphValue::Str("Sprint body".into()));
    assert_eq!(gw.prop("survivor-elem", "summary").unwrap(), GraphValue::Str("S".into()));
    assert!(gw.prop("loser-elem", "graph_id").unwrap().as_str().unwrap().starts_with("acme_archive_duplicates_"));
    assert_eq!(gw.edge_count(), 2);
}

#[tokio::test]
async fn s6_migration_m014_content_standardization() {
    let gw = Arc::new(FakeGateway::new());
    gw.seed_node(
        "sprint-1",
        "Sprint",
        &[
            ("id", GraphValue::Str("e001_s01".into())),
            ("goal", GraphValue::Str("do X".into())),
            ("content", GraphValue::Null),
        ],
    );

    let reconciler = Arc::new(GraphDuplicateReconciler::new(gw.clone()));
    let runner = GraphMigrationRunner::new(gw.clone(), reconciler);

    let first = runner.run_backfill(&tenant(), "M014", false).await.unwrap();
    assert_eq!(first.migrated, 1);
    assert_eq!(first.skipped, 0);
    assert_eq!(gw.prop("sprint-1", "content").unwrap(), GraphValue::Str("do X".into()));

    let second = runner.run_backfill(&tenant(), "M014", false).await.unwrap();
    assert_eq!(second.migrated, 0);
    assert_eq!(second.skipped, 1);
}
