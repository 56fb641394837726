//! kg-server — standalone REST server for the knowledge graph service.
//!
//! Reads config from env vars (see `kg_server::config::KgConfig`):
//!   KG_GRAPH_URI / KG_GRAPH_USER / KG_GRAPH_PASSWORD — Neo4j connection (required)
//!   KG_JWT_SECRET                                     — JWT HMAC secret (required)
//!   KG_BIND_ADDR                                       — listen address (default: 0.0.0.0:4100)
//!   KG_EMBEDDING_ENDPOINT / KG_EMBEDDING_API_KEY       — embedding provider (required)

use std::sync::Arc;
use std::time::Duration;

use kg_context::{GraphContextSynthesizer, TokenEstimateCoefficients};
use kg_core::ports::GraphGateway;
use kg_core::types::TenantId;
use kg_dlq::{DlqDispatcher, GraphDeadLetterQueue};
use kg_events::GraphEventStream;
use kg_graph::{GraphStores, Neo4jGateway};
use kg_search::{GraphSemanticSearch, HttpEmbeddingClient, SimilarityThresholds};
use kg_server::config::KgConfig;
use kg_server::middleware::jwt::JwtConfig;
use kg_server::router::build_router;
use kg_server::state::AppState;
use kg_verify::GraphVerificationStore;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kg_server=debug".into()),
        )
        .init();

    let config = KgConfig::from_env();

    let gateway = Neo4jGateway::connect(&config.graph_uri, &config.graph_user, &config.graph_password)
        .await
        .expect("failed to connect to graph store");
    tracing::info!("connected to graph store");

    let graph_stores = GraphStores::new(gateway);
    let shared_gateway: Arc<dyn GraphGateway> = graph_stores.gateway.clone();

    let thresholds = SimilarityThresholds {
        duplicate: config.similarity_duplicate,
        high: config.similarity_high,
        medium: config.similarity_medium,
    };
    let embeddings: Arc<dyn kg_core::ports::EmbeddingClient> = Arc::new(HttpEmbeddingClient::new(
        config.embedding_endpoint.clone(),
        config.embedding_api_key.clone(),
    ));
    let search: Arc<dyn kg_core::ports::SemanticSearch> = Arc::new(GraphSemanticSearch::new(
        shared_gateway.clone(),
        embeddings,
        "node_embeddings",
        thresholds,
    ));

    let coefficients = TokenEstimateCoefficients {
        base: config.token_estimate_base,
        per_task: config.token_estimate_per_task,
        per_event: config.token_estimate_per_event,
        charter: config.token_estimate_charter,
        per_team_event: config.token_estimate_per_team_event,
    };
    let context: Arc<dyn kg_core::ports::ContextSynthesizer> = Arc::new(GraphContextSynthesizer::new(
        shared_gateway.clone(),
        Duration::from_millis(config.session_start_budget_ms),
        coefficients,
    ));

    let events: Arc<dyn kg_core::ports::EventStream> = Arc::new(GraphEventStream::new(
        shared_gateway.clone(),
        Duration::from_millis(config.poll_interval_ms),
    ));

    let dlq: Arc<dyn kg_core::ports::DeadLetterQueue> =
        Arc::new(GraphDeadLetterQueue::new(shared_gateway.clone(), config.dlq_max_retries));

    let verification: Arc<dyn kg_core::ports::VerificationStore> =
        Arc::new(GraphVerificationStore::new(shared_gateway.clone()));

    // Spawn the DLQ sweep as a background task, one per tenant actually
    // present in the store — the dispatcher's `tenant` field scopes a
    // single sweep loop to one tenant, the way the teacher's
    // `OutboxDispatcher` scoped one loop to one event type.
    let tenant_ids = kg_graph::list_tenant_ids(shared_gateway.as_ref())
        .await
        .expect("failed to enumerate tenants for DLQ dispatch");
    for tenant in &tenant_ids {
        let dispatcher = DlqDispatcher::new(
            dlq.clone(),
            TenantId::new(tenant.clone()),
            Duration::from_millis(config.dlq_dispatch_interval_ms),
            20,
        );
        tokio::spawn(async move {
            dispatcher.run().await;
        });
        tracing::info!(tenant = %tenant, "dlq dispatcher spawned");
    }

    let state = AppState {
        nodes: graph_stores.nodes.clone(),
        duplicates: graph_stores.duplicates.clone(),
        search,
        context,
        events,
        dlq,
        migrations: graph_stores.migrations.clone(),
        verification,
        admin_allowlist: Arc::new(config.admin_allowlist.clone()),
    };

    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());

    let app = build_router(state, jwt_config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {}: {e}", config.bind_addr));
    tracing::info!("kg-server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("server error");
}
