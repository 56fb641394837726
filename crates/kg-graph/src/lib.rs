//! kg-graph — neo4rs implementations of kg-core's graph-backed port traits.
//!
//! - Neo4jGateway             (C1 GraphGateway)
//! - GraphNodeRepository      (C3 NodeRepository)
//! - GraphDuplicateReconciler (C4 DuplicateReconciler)
//! - GraphMigrationRunner     (C9 MigrationRunner)

pub mod cypher;
pub mod gateway;
pub mod migrations;
pub mod reconciler;
pub mod repository;

pub use gateway::Neo4jGateway;
pub use migrations::GraphMigrationRunner;
pub use reconciler::GraphDuplicateReconciler;
pub use repository::GraphNodeRepository;

use std::collections::HashMap;
use std::sync::Arc;

use kg_core::ports::{GraphGateway, Result};

/// Distinct `graph_id` values actually present in the store, for callers
/// (the DLQ dispatcher's startup sweep) that need the real tenant set
/// rather than a config-file guess. Archive namespaces created by
/// `TenantId::archive_namespace` are not live tenants and are excluded.
pub async fn list_tenant_ids(gateway: &dyn GraphGateway) -> Result<Vec<String>> {
    let rows = gateway
        .execute(
            "MATCH (n) WHERE n.graph_id IS NOT NULL RETURN DISTINCT n.graph_id AS tenant",
            HashMap::new(),
        )
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|r| r.get_string("tenant"))
        .filter(|t| !t.contains("_archive_duplicates_"))
        .collect())
}

/// Convenience struct that constructs all graph-backed adapters from a
/// single `Neo4jGateway`, the way `PgStores` in the relational teacher
/// shared one pool across adapters.
pub struct GraphStores {
    pub gateway: Arc<Neo4jGateway>,
    pub nodes: Arc<GraphNodeRepository>,
    pub duplicates: Arc<GraphDuplicateReconciler>,
    pub migrations: Arc<GraphMigrationRunner>,
}

impl GraphStores {
    pub fn new(gateway: Neo4jGateway) -> Self {
        let gateway = Arc::new(gateway);
        let duplicates = Arc::new(GraphDuplicateReconciler::new(gateway.clone()));
        let nodes = Arc::new(GraphNodeRepository::new(gateway.clone()));
        let migrations = Arc::new(GraphMigrationRunner::new(gateway.clone(), duplicates.clone()));
        Self {
            gateway,
            nodes,
            duplicates,
            migrations,
        }
    }
}
