//! `GraphSemanticSearch` — C5's vector-index top-K query plus score→
//! relationship-kind mapping (§4.5). Query shape grounded on
//! `dashflow-neo4j`'s `similarity_search_by_vector_internal`
//! (`CALL db.index.vector.queryNodes(...) YIELD node, score`); tenant and
//! label/status filters are bound as parameters, never interpolated, per
//! §9's "string-interpolated queries" note.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kg_core::dto::{SearchHit, SearchParams};
use kg_core::ports::{EmbeddingClient, GraphGateway, Result, SemanticSearch};
use kg_core::tenant::scope_clause;
use kg_core::types::TenantId;
use serde_json::Value;

use crate::thresholds::SimilarityThresholds;

pub struct GraphSemanticSearch {
    gateway: Arc<dyn GraphGateway>,
    embeddings: Arc<dyn EmbeddingClient>,
    index_name: String,
    thresholds: SimilarityThresholds,
}

impl GraphSemanticSearch {
    pub fn new(
        gateway: Arc<dyn GraphGateway>,
        embeddings: Arc<dyn EmbeddingClient>,
        index_name: impl Into<String>,
        thresholds: SimilarityThresholds,
    ) -> Self {
        Self {
            gateway,
            embeddings,
            index_name: index_name.into(),
            thresholds,
        }
    }
}

#[async_trait]
impl SemanticSearch for GraphSemanticSearch {
    async fn search(&self, tenant: &TenantId, params: SearchParams) -> Result<Vec<SearchHit>> {
        let vectors = self
            .embeddings
            .embed(&[params.query.clone()], kg_core::dto::EmbeddingKind::Query)
            .await?;
        let Some(query_vector) = vectors.into_iter().next() else {
            return Ok(Vec::new());
        };

        // Over-fetch 2x, then post-filter by type/status and min score
        // (§4.5 steps 2-3).
        let fetch_k = (params.limit as i64) * 2;
        let query = format!(
            "CALL db.index.vector.queryNodes($index_name, $k, $embedding) YIELD node, score \
             WHERE ({}) \
             AND ($label IS NULL OR $label IN labels(node)) \
             AND ($status IS NULL OR node.status = $status) \
             RETURN node.id AS id, labels(node) AS labels, score, node.updatedAt AS updated_at \
             ORDER BY score DESC",
            scope_clause("node")
        );

        let mut bind: HashMap<String, Value> = HashMap::new();
        bind.insert("index_name".into(), Value::String(self.index_name.clone()));
        bind.insert("k".into(), Value::from(fetch_k));
        bind.insert(
            "embedding".into(),
            Value::Array(query_vector.iter().map(|f| Value::from(*f as f64)).collect()),
        );
        bind.insert("tenant".into(), Value::String(tenant.as_str().to_string()));
        bind.insert(
            "label".into(),
            params.label.clone().map(Value::String).unwrap_or(Value::Null),
        );
        bind.insert(
            "status".into(),
            params.status.clone().map(Value::String).unwrap_or(Value::Null),
        );

        let rows = self.gateway.execute(&query, bind).await?;

        let mut hits: Vec<SearchHit> = rows
            .into_iter()
            .filter_map(|row| {
                let score = row.get_f64("score") as f32;
                if score < params.min_score {
                    return None;
                }
                let id = row.get_string("id")?;
                let label = first_label(&row);
                let updated_at = row
                    .get_string("updated_at")
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&chrono::Utc));
                Some(SearchHit {
                    node_id: id,
                    label,
                    score,
                    relationship_type: self.thresholds.classify(score),
                    updated_at,
                })
            })
            .collect();

        // §4.5 tie-break: descending score, then descending updatedAt, then
        // lexicographic id.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.updated_at.cmp(&a.updated_at))
                .then(a.node_id.cmp(&b.node_id))
        });
        hits.truncate(params.limit as usize);
        Ok(hits)
    }
}

fn first_label(row: &kg_core::graph_value::GraphRow) -> String {
    match row.get("labels") {
        kg_core::graph_value::GraphValue::List(l) => l
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        _ => String::new(),
    }
}

trait GraphRowFloatExt {
    fn get_f64(&self, key: &str) -> f64;
}

impl GraphRowFloatExt for kg_core::graph_value::GraphRow {
    fn get_f64(&self, key: &str) -> f64 {
        self.get(key).as_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_core::graph_value::{GraphRow, GraphValue};
    use std::collections::HashMap as StdHashMap;

    struct FakeGateway {
        rows: Vec<GraphRow>,
    }

    #[async_trait]
    impl GraphGateway for FakeGateway {
        async fn execute(&self, _query: &str, _params: HashMap<String, Value>) -> Result<Vec<GraphRow>> {
            Ok(self.rows.clone())
        }
        async fn verify_connectivity(&self) -> Result<()> {
            Ok(())
        }
    }

    struct FakeEmbeddings;

    #[async_trait]
    impl EmbeddingClient for FakeEmbeddings {
        async fn embed(&self, texts: &[String], _kind: kg_core::dto::EmbeddingKind) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }
    }

    fn row(id: &str, label: &str, score: f64) -> GraphRow {
        let mut m = StdHashMap::new();
        m.insert("id".into(), GraphValue::Str(id.into()));
        m.insert("labels".into(), GraphValue::List(vec![GraphValue::Str(label.into())]));
        m.insert("score".into(), GraphValue::Float(score));
        m.insert("updated_at".into(), GraphValue::Null);
        GraphRow(m)
    }

    #[tokio::test]
    async fn filters_by_min_score_and_truncates() {
        let gateway = Arc::new(FakeGateway {
            rows: vec![
                row("a", "Task", 0.99),
                row("b", "Task", 0.80),
                row("c", "Task", 0.10),
            ],
        });
        let search = GraphSemanticSearch::new(
            gateway,
            Arc::new(FakeEmbeddings),
            "vector_index",
            SimilarityThresholds::default(),
        );
        let tenant = TenantId::new("acme");
        let hits = search
            .search(
                &tenant,
                SearchParams {
                    query: "find it".into(),
                    limit: 10,
                    label: None,
                    status: None,
                    min_score: 0.75,
                },
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node_id, "a");
        assert_eq!(hits[0].relationship_type, kg_core::types::SearchRelationshipKind::DuplicateOf);
    }

    #[tokio::test]
    async fn empty_embedding_short_circuits() {
        struct EmptyEmbeddings;
        #[async_trait]
        impl EmbeddingClient for EmptyEmbeddings {
            async fn embed(&self, _: &[String], _: kg_core::dto::EmbeddingKind) -> Result<Vec<Vec<f32>>> {
                Ok(vec![])
            }
        }
        let gateway = Arc::new(FakeGateway { rows: vec![] });
        let search = GraphSemanticSearch::new(
            gateway,
            Arc::new(EmptyEmbeddings),
            "vector_index",
            SimilarityThresholds::default(),
        );
        let tenant = TenantId::new("acme");
        let hits = search
            .search(
                &tenant,
                SearchParams {
                    query: "x".into(),
                    limit: 5,
                    label: None,
                    status: None,
                    min_score: 0.75,
                },
            )
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
