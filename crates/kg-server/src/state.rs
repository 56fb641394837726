//! Shared application state — one `Arc<dyn Trait>` per port, bundled the
//! way `kg-graph::GraphStores` bundles its own adapters.

use std::sync::Arc;

use kg_core::ports::{
    ContextSynthesizer, DeadLetterQueue, DuplicateReconciler, EventStream, MigrationRunner,
    NodeRepository, SemanticSearch, VerificationStore,
};

#[derive(Clone)]
pub struct AppState {
    pub nodes: Arc<dyn NodeRepository>,
    pub duplicates: Arc<dyn DuplicateReconciler>,
    pub search: Arc<dyn SemanticSearch>,
    pub context: Arc<dyn ContextSynthesizer>,
    pub events: Arc<dyn EventStream>,
    pub dlq: Arc<dyn DeadLetterQueue>,
    pub migrations: Arc<dyn MigrationRunner>,
    pub verification: Arc<dyn VerificationStore>,
    /// Principal ids permitted to run apply-mode cleanup (§9 admin gate).
    pub admin_allowlist: Arc<Vec<String>>,
}
