use chrono::{DateTime, Utc};
use std::sync::Arc;
use validator::Validate;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::gates::{GateChain, GateContext};
use crate::metrics;
use crate::models::{AttemptKey, AttemptRecord, AttemptStats, Decision, EvaluateRequest};
use crate::store::{AttemptStore, StoreError};
use crate::utils::retry::{retry_async_when, RetryConfig};
use crate::utils::time::{seconds_before, Clock};

/// Decides, per chat message, whether the hint level may go up.
///
/// Each evaluation reads the whole attempt record, runs the gate chain and,
/// only when every gate passes, writes the updated record back with a
/// conditional put on the `revision` it read. Losing that race means another
/// request for the same key committed first; the evaluation starts over from
/// a fresh read.
pub struct HintGateService {
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
    gates: GateChain,
    config: GateConfig,
    store_timeout: std::time::Duration,
    read_retry: RetryConfig,
}

impl HintGateService {
    pub fn new(
        store: Arc<dyn AttemptStore>,
        clock: Arc<dyn Clock>,
        config: GateConfig,
        store_timeout: std::time::Duration,
    ) -> Self {
        Self {
            store,
            clock,
            gates: GateChain::from_config(&config),
            config,
            store_timeout,
            read_retry: RetryConfig::store_read(),
        }
    }

    pub fn with_read_retry(mut self, read_retry: RetryConfig) -> Self {
        self.read_retry = read_retry;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Same as [`evaluate`](Self::evaluate) with `now` taken from the clock.
    pub async fn evaluate_now(&self, req: &EvaluateRequest) -> Result<Decision, GateError> {
        self.evaluate(req, self.clock.now()).await
    }

    pub async fn evaluate(
        &self,
        req: &EvaluateRequest,
        now: DateTime<Utc>,
    ) -> Result<Decision, GateError> {
        req.validate()?;

        let key = req.key();
        let message = req.message.trim();
        let max_attempts = self.config.max_commit_retries.max(1);

        for attempt in 1..=max_attempts {
            let stored = self.load(&key).await?;
            let expected_revision = stored.as_ref().map(|record| record.revision);
            let record = stored.unwrap_or_default();
            let ctx = GateContext::new(&record, message, now);

            if let Err(rejection) = self.gates.run(&ctx) {
                let decision = Decision::rejected(rejection, record.count);
                tracing::warn!(
                    "Hint request rejected: key={}, reason={}, hint_level={}",
                    key,
                    rejection.reason,
                    record.count
                );
                metrics::record_decision(&decision);
                return Ok(decision);
            }

            let mut updated = record;
            let hint_level = updated.record_acceptance(&req.message, now);

            if self.config.prune_history {
                let cutoff = seconds_before(now, self.config.rate_window_seconds);
                let pruned = updated.prune_before(cutoff);
                if pruned > 0 {
                    tracing::debug!("Pruned {} stale attempts for key={}", pruned, key);
                }
            }
            updated.next_revision();

            if self.commit(&key, expected_revision, &updated).await? {
                let decision = Decision::allowed(hint_level);
                tracing::info!(
                    "Hint level granted: key={}, hint_level={}",
                    key,
                    hint_level
                );
                metrics::record_decision(&decision);
                return Ok(decision);
            }

            metrics::HINT_GATE_COMMIT_CONFLICTS_TOTAL.inc();
            tracing::warn!(
                "Attempt record changed during evaluation: key={}, attempt={}/{}",
                key,
                attempt,
                max_attempts
            );
        }

        Err(GateError::ConcurrentUpdate {
            key: key.to_string(),
            attempts: max_attempts,
        })
    }

    /// Deletes the record; the next request starts again from hint level 1.
    pub async fn reset(&self, key: &AttemptKey) -> Result<(), GateError> {
        key.validate()?;

        self.guarded("delete", self.store.delete(key))
            .await
            .map_err(|e| {
                tracing::error!("Failed to reset attempts for key={}: {}", key, e);
                GateError::from(e)
            })?;

        tracing::info!("Reset hint attempts for key={}", key);
        Ok(())
    }

    pub async fn stats(&self, key: &AttemptKey) -> Result<AttemptStats, GateError> {
        key.validate()?;

        let record = self.load(key).await?.unwrap_or_default();
        Ok(AttemptStats::from(record))
    }

    /// Reads the record; missing and expired both come back as `None`.
    /// Reads are idempotent, so transient failures are retried.
    async fn load(&self, key: &AttemptKey) -> Result<Option<AttemptRecord>, GateError> {
        let record = retry_async_when(
            self.read_retry.clone(),
            StoreError::is_transient,
            || async move { self.guarded("get", self.store.get(key)).await },
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to read attempts for key={}: {}", key, e);
            GateError::from(e)
        })?;

        Ok(record)
    }

    /// Conditional write. Not retried: after a timeout the write may already
    /// have landed.
    async fn commit(
        &self,
        key: &AttemptKey,
        expected_revision: Option<u64>,
        record: &AttemptRecord,
    ) -> Result<bool, GateError> {
        self.guarded(
            "compare_and_put",
            self.store.compare_and_put(
                key,
                expected_revision,
                record,
                self.config.record_ttl_seconds,
            ),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to commit attempts for key={}: {}", key, e);
            GateError::from(e)
        })
    }

    async fn guarded<T, F>(&self, operation: &str, future: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        let timeout = self.store_timeout;
        metrics::track_store_operation(operation, async move {
            tokio::time::timeout(timeout, future)
                .await
                .unwrap_or_else(|_| Err(StoreError::Timeout(timeout)))
        })
        .await
    }
}
