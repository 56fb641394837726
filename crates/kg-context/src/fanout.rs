//! Structured fan-out primitive for C6 (§9: "use a structured concurrency
//! primitive that cancels sibling tasks on deadline and collects results +
//! per-task errors separately"). Every sub-query of the session-start and
//! strategic-context calls is run through `absorb`, which converts a
//! timeout or an `Err` into the type's default value and logs instead of
//! propagating — this is what lets §4.6's fan-out phase tolerate one failed
//! branch without failing the whole call (§8 property 10).

use std::future::Future;
use std::time::Duration;

use kg_core::error::KgError;

pub async fn absorb<T, F>(label: &'static str, budget: Duration, fut: F) -> T
where
    T: Default,
    F: Future<Output = Result<T, KgError>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            tracing::warn!(query = label, error = %e, "session-start sub-query failed, using empty result");
            T::default()
        }
        Err(_) => {
            tracing::warn!(query = label, budget_ms = budget.as_millis() as u64, "session-start sub-query timed out");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absorbs_error() {
        let v: Vec<i32> = absorb("test", Duration::from_millis(50), async {
            Err(KgError::Internal(anyhow::anyhow!("boom")))
        })
        .await;
        assert!(v.is_empty());
    }

    #[tokio::test]
    async fn absorbs_timeout() {
        let v: Vec<i32> = absorb("test", Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1])
        })
        .await;
        assert!(v.is_empty());
    }

    #[tokio::test]
    async fn passes_through_success() {
        let v: Vec<i32> = absorb("test", Duration::from_millis(50), async { Ok(vec![1, 2]) }).await;
        assert_eq!(v, vec![1, 2]);
    }
}
