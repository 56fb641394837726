//! Dead-letter inspection and manual retry endpoints (C8).

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::Utc;
use kg_core::dto::DlqRetryOutcome;
use kg_core::error::KgError;
use kg_core::principal::Principal;
use kg_core::types::{DeadLetterEntry, DlqStatus};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::resolve_tenant;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<DlqStatus>,
    pub limit: Option<u32>,
}

pub async fn list(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<DeadLetterEntry>>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let entries = state.dlq.list(&tenant, q.status, q.limit.unwrap_or(20)).await?;
    Ok(Json(entries))
}

pub async fn get(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Option<DeadLetterEntry>>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let entry = state.dlq.get(&tenant, &id).await?;
    Ok(Json(entry))
}

/// `TooEarly` is surfaced as a `success: false` envelope, not an HTTP
/// error — §4.8's retry-after contract is meant for callers to branch on,
/// not to handle via status-code dispatch.
pub async fn retry(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<DlqRetryOutcome>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    match state.dlq.retry(&tenant, &id, Utc::now()).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(KgError::TooEarly { remaining_secs }) => {
            let entry = state.dlq.get(&tenant, &id).await?;
            let (status, retry_count) = entry
                .map(|e| (e.status, e.retry_count))
                .unwrap_or((DlqStatus::Pending, 0));
            Ok(Json(DlqRetryOutcome {
                success: false,
                status,
                retry_count,
                failure_reason: None,
                remaining_secs: Some(remaining_secs),
            }))
        }
        Err(e) => Err(e.into()),
    }
}
