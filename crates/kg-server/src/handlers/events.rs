//! Event append and long-poll tailing endpoints (C7).

use axum::{extract::Query, Extension, Json};
use kg_core::dto::StreamRequest;
use kg_core::principal::Principal;
use kg_core::types::Event;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::resolve_tenant;

pub async fn append(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(event): Json<Event>,
) -> Result<Json<Value>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    state.events.append(&tenant, event).await?;
    Ok(Json(serde_json::json!({"appended": true})))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub since: Option<String>,
    pub limit: Option<u32>,
    pub timeout_secs: Option<u32>,
    /// Comma-separated category list — there is no repeated-query-param
    /// convention elsewhere in this surface, so this stays consistent.
    pub categories: Option<String>,
    pub agent_id: Option<String>,
}

pub async fn stream(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Query(q): Query<StreamQuery>,
) -> Result<Json<kg_core::dto::StreamResponse>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let default = StreamRequest::default();
    let req = StreamRequest {
        since: q.since,
        limit: q.limit.unwrap_or(default.limit),
        timeout_secs: q.timeout_secs.unwrap_or(default.timeout_secs),
        categories: q
            .categories
            .map(|c| c.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default(),
        agent_id: q.agent_id,
    };
    let resp = state.events.stream(&tenant, req).await?;
    Ok(Json(resp))
}
