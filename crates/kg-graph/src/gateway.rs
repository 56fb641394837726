//! C1 — Graph Gateway. Owns the `neo4rs` connection pool, executes
//! parametric Cypher, and normalizes returned values into `GraphValue`.

use std::collections::HashMap;

use async_trait::async_trait;
use kg_core::error::KgError;
use kg_core::graph_value::{GraphRow, GraphValue};
use kg_core::ports::{GraphGateway, Result};
use neo4rs::{BoltType, Graph, Query};

pub struct Neo4jGateway {
    graph: Graph,
}

impl Neo4jGateway {
    pub async fn connect(uri: &str, user: &str, password: &str) -> anyhow::Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| anyhow::anyhow!("failed to connect to graph store: {e}"))?;
        Ok(Self { graph })
    }

    pub fn handle(&self) -> &Graph {
        &self.graph
    }
}

/// Converts a JSON param bag into `neo4rs`'s native bind type at the single
/// boundary where this adapter talks to the driver — nothing else in
/// `kg-graph` constructs a `BoltType` by hand.
fn build_query(cypher: &str, params: HashMap<String, serde_json::Value>) -> Query {
    let mut q = Query::new(cypher.to_string());
    for (k, v) in params {
        q = q.param(&k, json_to_bolt(v));
    }
    q
}

fn json_to_bolt(v: serde_json::Value) -> BoltType {
    match v {
        serde_json::Value::Null => BoltType::from(()),
        serde_json::Value::Bool(b) => b.into(),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or(0.0).into(),
        },
        serde_json::Value::String(s) => s.into(),
        serde_json::Value::Array(items) => {
            let items: Vec<BoltType> = items.into_iter().map(json_to_bolt).collect();
            items.into()
        }
        serde_json::Value::Object(map) => {
            let map: HashMap<String, BoltType> =
                map.into_iter().map(|(k, v)| (k, json_to_bolt(v))).collect();
            map.into()
        }
    }
}

/// Normalizes a query-result column, via `serde_json::Value` as the
/// intermediate representation, into `GraphValue` — §4.1's numeric
/// normalization rule (`nil → Null`, large-integer → 64-bit, float →
/// as-is, string → as-is). Every downstream component reads through
/// `GraphValue`, never through a raw driver type.
fn json_to_graph_value(v: serde_json::Value) -> GraphValue {
    match v {
        serde_json::Value::Null => GraphValue::Null,
        serde_json::Value::Bool(b) => GraphValue::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => GraphValue::Int(i),
            None => GraphValue::Float(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => GraphValue::Str(s),
        serde_json::Value::Array(items) => {
            GraphValue::List(items.into_iter().map(json_to_graph_value).collect())
        }
        serde_json::Value::Object(map) => GraphValue::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_graph_value(v)))
                .collect(),
        ),
    }
}

#[async_trait]
impl GraphGateway for Neo4jGateway {
    async fn execute(&self, query: &str, params: HashMap<String, serde_json::Value>) -> Result<Vec<GraphRow>> {
        let q = build_query(query, params);
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| KgError::Internal(anyhow::anyhow!("query failed: {e}")))?;

        let mut rows = Vec::new();
        loop {
            let next = stream
                .next()
                .await
                .map_err(|e| KgError::Internal(anyhow::anyhow!("failed to read row: {e}")))?;
            let Some(row) = next else { break };
            let mut map = HashMap::new();
            for key in row.keys() {
                if let Ok(value) = row.get::<serde_json::Value>(key) {
                    map.insert(key.to_string(), json_to_graph_value(value));
                }
            }
            rows.push(GraphRow(map));
        }
        Ok(rows)
    }

    async fn verify_connectivity(&self) -> Result<()> {
        let mut stream = self
            .graph
            .execute(Query::new("RETURN 1".to_string()))
            .await
            .map_err(|e| KgError::ServiceUnavailable(format!("graph store unreachable: {e}")))?;
        stream
            .next()
            .await
            .map_err(|e| KgError::ServiceUnavailable(format!("graph store unreachable: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_graph_value_preserves_shape() {
        let v = serde_json::json!({"a": 1, "b": [true, null, "x"]});
        let gv = json_to_graph_value(v);
        let map = gv.as_map().unwrap();
        assert_eq!(map.get("a").unwrap().as_i64(), 1);
        let GraphValue::List(list) = map.get("b").unwrap() else {
            panic!("expected list");
        };
        assert_eq!(list.len(), 3);
        assert!(list[1].is_null());
    }
}
