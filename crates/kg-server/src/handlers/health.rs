//! Health check endpoint.

use axum::Json;
use serde_json::{json, Value};

/// Basic liveness check. Deliberately does not touch the graph store —
/// connectivity is a separate concern (`GraphGateway::verify_connectivity`),
/// not wired to a public route by default.
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
