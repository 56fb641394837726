//! Typed node upsert, read, list, and relationship endpoints (C3).

use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use kg_core::dto::{ListNodesFilter, UpsertResult};
use kg_core::graph_value::GraphRow;
use kg_core::principal::Principal;
use kg_core::types::{Direction, Document, Epic, RelationshipEdge, Sprint, Task};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::resolve_tenant;

pub async fn upsert_epic(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(epic): Json<Epic>,
) -> Result<Json<UpsertResult>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let result = state.nodes.upsert_epic(&tenant, &epic, &principal).await?;
    Ok(Json(result))
}

pub async fn upsert_sprint(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(sprint): Json<Sprint>,
) -> Result<Json<UpsertResult>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let result = state.nodes.upsert_sprint(&tenant, &sprint, &principal).await?;
    Ok(Json(result))
}

pub async fn upsert_task(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(task): Json<Task>,
) -> Result<Json<UpsertResult>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let result = state.nodes.upsert_task(&tenant, &task, &principal).await?;
    Ok(Json(result))
}

pub async fn upsert_document(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(doc): Json<Document>,
) -> Result<Json<UpsertResult>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let result = state.nodes.upsert_document(&tenant, &doc, &principal).await?;
    Ok(Json(result))
}

/// `GraphRow` carries no `Serialize` impl — it's a typed accessor, not a
/// transport shape — so every row crossing this boundary goes through
/// `GraphValue::to_json` first.
fn row_to_json(row: &GraphRow) -> serde_json::Value {
    serde_json::Value::Object(row.0.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}

pub async fn get_node(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Option<serde_json::Value>>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let node = state.nodes.get_node(&tenant, &id).await?;
    Ok(Json(node.as_ref().map(row_to_json)))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListNodesQuery {
    pub label: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_nodes(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Query(q): Query<ListNodesQuery>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let filter = ListNodesFilter {
        label: q.label,
        status: q.status,
        tags: q.tags.map(|t| t.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()).unwrap_or_default(),
        limit: q.limit.unwrap_or(20),
        offset: q.offset.unwrap_or(0),
    }
    .normalized();
    let nodes = state.nodes.list_nodes(&tenant, filter).await?;
    Ok(Json(nodes.iter().map(row_to_json).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateRelationshipBody {
    pub from_id: String,
    pub to_id: String,
    pub rel_type: String,
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
}

pub async fn create_relationship(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateRelationshipBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let created = state
        .nodes
        .create_relationship(&tenant, &body.from_id, &body.to_id, &body.rel_type, body.props)
        .await?;
    Ok(Json(serde_json::json!({"created": created})))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListRelationshipsQuery {
    pub direction: Option<String>,
}

pub async fn list_relationships(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Query(q): Query<ListRelationshipsQuery>,
) -> Result<Json<Vec<RelationshipEdge>>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let direction = match q.direction.as_deref() {
        Some("incoming") => Direction::Incoming,
        Some("outgoing") => Direction::Outgoing,
        _ => Direction::Both,
    };
    let edges = state.nodes.list_relationships(&tenant, &id, direction).await?;
    Ok(Json(edges))
}
