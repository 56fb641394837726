//! C6 — fans session-start and strategic-context requests out to the
//! read-only queries in `queries.rs`, absorbs per-branch failures under a
//! wall-clock budget (§4.6, §9), and reduces the results into the response
//! DTOs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use kg_core::dto::{
    ActiveSprintContext, CurrentTaskContext, SessionMetadata, SessionStartRequest, SessionStartResponse,
    StrategicContextRequest, StrategicContextResponse,
};
use kg_core::ports::{ContextSynthesizer, GraphGateway, Result};
use kg_core::types::{Epic, Sprint, Task, TaskStatus, TenantId};

use crate::fanout::absorb;
use crate::queries;
use crate::token_estimate::TokenEstimateCoefficients;

pub struct GraphContextSynthesizer {
    gateway: Arc<dyn GraphGateway>,
    budget: Duration,
    coefficients: TokenEstimateCoefficients,
}

impl GraphContextSynthesizer {
    pub fn new(gateway: Arc<dyn GraphGateway>, budget: Duration, coefficients: TokenEstimateCoefficients) -> Self {
        Self { gateway, budget, coefficients }
    }

    /// Strategy A/B/C cascade (§4.6.1): an explicit `sprint_id` wins if it
    /// resolves; otherwise the most-recently-active eligible sprint;
    /// otherwise the most-recently-created sprint regardless of status.
    async fn pick_sprint(&self, tenant: &TenantId, hint: Option<&str>) -> Result<Option<Sprint>> {
        if let Some(id) = hint {
            if let Some(sprint) = queries::fetch_sprint(&self.gateway, tenant, id).await? {
                return Ok(Some(sprint));
            }
        }
        if let Some(sprint) = queries::strategy_b_sprint(&self.gateway, tenant).await? {
            return Ok(Some(sprint));
        }
        queries::strategy_c_sprint(&self.gateway, tenant).await
    }

    async fn resolve_sprint_phase(&self, tenant: &TenantId, hint: Option<&str>) -> Result<SprintResolution> {
        let Some(sprint) = self.pick_sprint(tenant, hint).await? else {
            return Ok(SprintResolution::default());
        };
        let epic = queries::fetch_epic(&self.gateway, tenant, &sprint.epic_id).await?;
        let tasks = queries::fetch_tasks_for_sprint(&self.gateway, tenant, &sprint.id).await?;
        let next = queries::fetch_next_task(&self.gateway, tenant, &sprint.id).await?;
        let task_count = tasks.len() as u32;
        let current_task = next.or_else(|| {
            tasks
                .into_iter()
                .find(|t| !matches!(t.status, TaskStatus::Complete | TaskStatus::Blocked))
        });
        Ok(SprintResolution { sprint: Some(sprint), epic, current_task, task_count })
    }
}

/// Intermediate shape for the fan-out phase — `ActiveSprintContext` doesn't
/// carry the sprint's total task count, which `SessionMetadata` needs.
#[derive(Default)]
struct SprintResolution {
    sprint: Option<Sprint>,
    epic: Option<Epic>,
    current_task: Option<Task>,
    task_count: u32,
}

#[async_trait]
impl ContextSynthesizer for GraphContextSynthesizer {
    async fn session_start(&self, tenant: &TenantId, req: SessionStartRequest) -> Result<SessionStartResponse> {
        let start = Instant::now();
        let budget = self.budget;
        let since = Utc::now() - chrono::Duration::days(req.team_event_days as i64);

        let (sprint_res, recent_events, charter, team_activity) = tokio::join!(
            absorb("active_sprint", budget, self.resolve_sprint_phase(tenant, req.sprint_id.as_deref())),
            absorb(
                "recent_events",
                budget,
                queries::fetch_recent_events(&self.gateway, tenant, &req.user_id, req.event_limit)
            ),
            absorb("charter", budget, queries::fetch_charter(&self.gateway, tenant)),
            absorb(
                "team_activity",
                budget,
                queries::fetch_team_activity(&self.gateway, tenant, &req.user_id, since, 10)
            ),
        );

        // Enrichment phase (§4.6.2) only runs when there's a current task to
        // enrich — three more queries in parallel, same absorbed budget.
        let (patterns, gotchas, constraints) = match &sprint_res.current_task {
            Some(task) => {
                tokio::join!(
                    absorb("patterns", budget, queries::fetch_patterns_for_task(&self.gateway, tenant, &task.id)),
                    absorb("gotchas", budget, queries::fetch_gotchas_for_task(&self.gateway, tenant, &task.id)),
                    absorb(
                        "constraints",
                        budget,
                        queries::fetch_adr_constraints_for_task(&self.gateway, tenant, &task.id)
                    ),
                )
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        let sprint_found = sprint_res.sprint.is_some();
        let task_count = sprint_res.task_count;
        let event_count = recent_events.len() as u32;
        let token_estimate =
            self.coefficients.estimate(task_count, event_count, charter.is_some(), team_activity.len() as u32);

        let active_sprint = ActiveSprintContext {
            sprint: sprint_res.sprint,
            epic: sprint_res.epic.clone(),
            current_task: CurrentTaskContext { task: sprint_res.current_task, patterns, gotchas, constraints },
        };

        Ok(SessionStartResponse {
            epic: sprint_res.epic,
            active_sprint,
            recent_events,
            charter,
            team_activity,
            metadata: SessionMetadata {
                load_time_ms: start.elapsed().as_millis() as u64,
                sprint_found,
                task_count,
                event_count,
                token_estimate,
            },
        })
    }

    async fn strategic_context(&self, tenant: &TenantId, req: StrategicContextRequest) -> Result<StrategicContextResponse> {
        let budget = self.budget;
        let top_k = if req.top_k == 0 { 5 } else { req.top_k };
        let since = Utc::now() - chrono::Duration::days(7);

        let (charter, team_activity, patterns, gotchas, decisions) = tokio::join!(
            absorb("charter", budget, queries::fetch_charter(&self.gateway, tenant)),
            absorb("team_activity", budget, queries::fetch_team_activity(&self.gateway, tenant, "", since, 10)),
            absorb("patterns", budget, queries::fetch_top_patterns(&self.gateway, tenant, top_k)),
            absorb("gotchas", budget, queries::fetch_top_gotchas(&self.gateway, tenant, top_k)),
            absorb("decisions", budget, queries::fetch_top_decisions(&self.gateway, tenant, top_k, &req.tags)),
        );

        Ok(StrategicContextResponse { charter, team_activity, patterns, gotchas, decisions })
    }
}
