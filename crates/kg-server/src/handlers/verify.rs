//! Task verification recording and the human-only override gate (C10).

use axum::{extract::Path, Extension, Json};
use kg_core::dto::VerifyResponse;
use kg_core::principal::Principal;
use kg_core::types::{CriterionResult, QualityOverride};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::resolve_tenant;

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub criteria: Vec<CriterionResult>,
}

pub async fn verify(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<String>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<VerifyResponse>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let resp = state.verification.verify(&tenant, &task_id, body.criteria).await?;
    Ok(Json(resp))
}

#[derive(Debug, Deserialize)]
pub struct OverrideBody {
    pub reason: String,
}

/// Only a `User` principal may reach this successfully — `Principal::
/// require_override_eligible` rejects agents before any write happens.
pub async fn override_verification(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<String>,
    Json(body): Json<OverrideBody>,
) -> Result<Json<QualityOverride>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let req = kg_core::dto::OverrideRequest { task_id, reason: body.reason };
    let resp = state.verification.override_verification(&tenant, &principal, req).await?;
    Ok(Json(resp))
}
