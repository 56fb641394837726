//! Session-start and strategic-context endpoints (C6).

use axum::{Extension, Json};
use kg_core::dto::{SessionStartRequest, SessionStartResponse, StrategicContextRequest, StrategicContextResponse};
use kg_core::principal::Principal;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::resolve_tenant;

#[derive(Debug, Deserialize)]
pub struct SessionStartBody {
    pub user_id: String,
    pub sprint_id: Option<String>,
    #[serde(default = "default_event_limit")]
    pub event_limit: u32,
    #[serde(default = "default_team_event_days")]
    pub team_event_days: u32,
}

fn default_event_limit() -> u32 {
    25
}

fn default_team_event_days() -> u32 {
    7
}

pub async fn session_start(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<SessionStartBody>,
) -> Result<Json<SessionStartResponse>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let req = SessionStartRequest {
        user_id: body.user_id,
        sprint_id: body.sprint_id,
        event_limit: body.event_limit,
        team_event_days: body.team_event_days,
    };
    let resp = state.context.session_start(&tenant, req).await?;
    Ok(Json(resp))
}

#[derive(Debug, Deserialize, Default)]
pub struct StrategicContextBody {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

fn default_top_k() -> u32 {
    5
}

pub async fn strategic_context(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<StrategicContextBody>,
) -> Result<Json<StrategicContextResponse>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let req = StrategicContextRequest { tags: body.tags, top_k: body.top_k };
    let resp = state.context.strategic_context(&tenant, req).await?;
    Ok(Json(resp))
}
