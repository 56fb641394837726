//! Semantic search endpoint (C5).

use axum::{Extension, Json};
use kg_core::dto::{SearchHit, SearchParams};
use kg_core::principal::Principal;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::resolve_tenant;

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub label: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_limit() -> u32 {
    10
}

fn default_min_score() -> f32 {
    0.75
}

pub async fn search(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<SearchBody>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let params = SearchParams {
        query: body.query,
        limit: body.limit,
        label: body.label,
        status: body.status,
        min_score: body.min_score,
    };
    let hits = state.search.search(&tenant, params).await?;
    Ok(Json(hits))
}
