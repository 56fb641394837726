//! Migration/cleanup runner and duplicate reconciliation endpoints (C4, C9).

use axum::{extract::Path, Extension, Json};
use kg_core::dto::{CleanupReport, MergeReport, MigrationReport};
use kg_core::principal::Principal;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::resolve_tenant;

#[derive(Debug, Deserialize, Default)]
pub struct DryRunQuery {
    #[serde(default)]
    pub dry_run: bool,
}

pub async fn run_backfill(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    Path(migration_id): Path<String>,
    axum::extract::Query(q): axum::extract::Query<DryRunQuery>,
) -> Result<Json<MigrationReport>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let report = state.migrations.run_backfill(&tenant, &migration_id, q.dry_run).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize, Default)]
pub struct CleanupQuery {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub also_dedupe: bool,
    #[serde(default)]
    pub confirm: Option<String>,
}

pub async fn run_cleanup(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    axum::extract::Query(q): axum::extract::Query<CleanupQuery>,
) -> Result<Json<CleanupReport>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    principal.require_admin(&state.admin_allowlist)?;
    let report = state
        .migrations
        .run_cleanup(&tenant, q.dry_run, q.also_dedupe, q.confirm.as_deref())
        .await?;
    Ok(Json(report))
}

pub async fn reconcile(
    Extension(state): Extension<AppState>,
    Extension(principal): Extension<Principal>,
    axum::extract::Query(q): axum::extract::Query<DryRunQuery>,
) -> Result<Json<MergeReport>, AppError> {
    let tenant = resolve_tenant(&principal)?;
    let report = state.duplicates.reconcile(&tenant, q.dry_run).await?;
    Ok(Json(report))
}
