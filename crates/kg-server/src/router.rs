//! Router construction for the knowledge graph server.

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};
use crate::state::AppState;

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState, jwt_config: JwtConfig) -> Router {
    // Routes that require JWT authentication
    let protected = Router::new()
        .route("/session/start", post(handlers::context::session_start))
        .route("/context/strategic", post(handlers::context::strategic_context))
        .route("/events", post(handlers::events::append))
        .route("/events/stream", get(handlers::events::stream))
        .route("/search", post(handlers::search::search))
        .route("/dlq", get(handlers::dlq::list))
        .route("/dlq/:id", get(handlers::dlq::get))
        .route("/dlq/:id/retry", post(handlers::dlq::retry))
        .route("/tasks/:task_id/verify", post(handlers::verify::verify))
        .route("/tasks/:task_id/override", post(handlers::verify::override_verification))
        .route("/migrations/:migration_id/backfill", post(handlers::migrations::run_backfill))
        .route("/migrations/cleanup", post(handlers::migrations::run_cleanup))
        .route("/migrations/reconcile", post(handlers::migrations::reconcile))
        .route("/nodes/epics", post(handlers::nodes::upsert_epic))
        .route("/nodes/sprints", post(handlers::nodes::upsert_sprint))
        .route("/nodes/tasks", post(handlers::nodes::upsert_task))
        .route("/nodes/documents", post(handlers::nodes::upsert_document))
        .route("/nodes/:id", get(handlers::nodes::get_node))
        .route("/nodes", get(handlers::nodes::list_nodes))
        .route("/nodes/:id/relationships", get(handlers::nodes::list_relationships))
        .route("/relationships", post(handlers::nodes::create_relationship))
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(handlers::health::health));

    // Combine and add shared state
    public.merge(protected).layer(Extension(state))
}
