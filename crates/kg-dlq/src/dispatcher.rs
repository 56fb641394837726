//! Background dead-letter retry sweep. Grounded on the teacher's
//! `OutboxDispatcher` claim/process/sleep loop — here "claim" is simply
//! listing pending entries, since `retry()` itself absorbs `TooEarly` by
//! returning it as an error the sweep just logs and moves past.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kg_core::error::KgError;
use kg_core::ports::DeadLetterQueue;
use kg_core::types::{DlqStatus, TenantId};

pub struct DlqDispatcher {
    dlq: Arc<dyn DeadLetterQueue>,
    tenant: TenantId,
    interval: Duration,
    sweep_limit: u32,
}

impl DlqDispatcher {
    pub fn new(dlq: Arc<dyn DeadLetterQueue>, tenant: TenantId, interval: Duration, sweep_limit: u32) -> Self {
        Self { dlq, tenant, interval, sweep_limit }
    }

    /// Runs forever; spawn via `tokio::spawn`.
    pub async fn run(&self) {
        tracing::info!(tenant = %self.tenant, interval_ms = self.interval.as_millis() as u64, "dlq dispatcher started");
        loop {
            match self.dlq.list(&self.tenant, Some(DlqStatus::Pending), self.sweep_limit).await {
                Ok(entries) if entries.is_empty() => {
                    tokio::time::sleep(self.interval).await;
                }
                Ok(entries) => {
                    for entry in entries {
                        self.retry_one(&entry.id).await;
                    }
                    tokio::time::sleep(self.interval).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "dlq sweep listing failed");
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }

    async fn retry_one(&self, id: &str) {
        match self.dlq.retry(&self.tenant, id, Utc::now()).await {
            Ok(outcome) if outcome.success => {
                tracing::info!(dlq_id = id, "dlq entry resolved");
            }
            Ok(outcome) => {
                tracing::warn!(dlq_id = id, status = ?outcome.status, retry_count = outcome.retry_count, "dlq retry did not resolve");
            }
            Err(KgError::TooEarly { remaining_secs }) => {
                tracing::debug!(dlq_id = id, remaining_secs, "dlq entry not yet eligible for retry");
            }
            Err(e) => {
                tracing::error!(dlq_id = id, error = %e, "dlq retry failed");
            }
        }
    }
}
