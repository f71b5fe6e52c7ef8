use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, stream};
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    application::{handlers::delivery_worker::DeliveryWorker, services::progress::ProgressReporter},
    domain::models::{DeliveryOutcome, DispatchJob, Recipient, RunState, RunSummary, RunTally},
};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub chunk_size: usize,
    /// Attempts in flight within a chunk.
    pub concurrency: usize,
    pub chunk_delay_min: Duration,
    pub chunk_delay_max: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            concurrency: 10,
            chunk_delay_min: Duration::from_millis(500),
            chunk_delay_max: Duration::from_secs(5),
        }
    }
}

/// Runs a job over a recipient list chunk by chunk. A chunk is fully
/// resolved before the next one is submitted.
pub struct DispatchPool {
    worker: Arc<DeliveryWorker>,
    config: PoolConfig,
}

impl DispatchPool {
    pub fn new(worker: Arc<DeliveryWorker>, config: PoolConfig) -> Self {
        Self { worker, config }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn chunk_count(&self, recipients: usize) -> usize {
        recipients.div_ceil(self.config.chunk_size.max(1))
    }

    pub async fn run(
        &self,
        recipients: &[Recipient],
        job: &DispatchJob,
        concurrency: usize,
        reporter: &mut ProgressReporter,
    ) -> RunSummary {
        let started = Instant::now();
        let chunk_size = self.config.chunk_size.max(1);
        let chunk_count = self.chunk_count(recipients.len());
        let concurrency = concurrency.max(1);

        info!(
            run_id = %job.run_id,
            total = recipients.len(),
            chunks = chunk_count,
            concurrency,
            "starting dispatch run"
        );

        // Attempts own their inputs so a run can be spawned onto the runtime.
        let shared_job = Arc::new(job.clone());
        let mut tally = RunTally::default();
        let mut state = RunState::Completed;
        let mut chunk_number = 0;

        for chunk in recipients.chunks(chunk_size) {
            chunk_number += 1;
            let before = tally;

            let mut outcomes = stream::iter(chunk.to_vec())
                .map(|recipient| {
                    let worker = Arc::clone(&self.worker);
                    let job = Arc::clone(&shared_job);
                    async move { worker.attempt(&recipient, &job).await }
                })
                .buffer_unordered(concurrency);

            let mut quota_denied = false;
            while let Some(outcome) = outcomes.next().await {
                quota_denied |= matches!(outcome, DeliveryOutcome::QuotaExceeded);
                tally.record(&outcome);
                reporter.observe(&tally, chunk_number).await;
            }

            debug!(
                run_id = %job.run_id,
                chunk = chunk_number,
                success = tally.success - before.success,
                failed = tally.failed - before.failed,
                "chunk resolved"
            );

            if quota_denied {
                warn!(
                    run_id = %job.run_id,
                    chunk = chunk_number,
                    deferred = recipients.len() - tally.attempted(),
                    "daily quota exhausted, pausing run"
                );
                state = RunState::PausedQuotaExceeded;
                break;
            }

            if chunk_number < chunk_count {
                tokio::time::sleep(self.chunk_delay()).await;
            }
        }

        reporter.finish(&tally, chunk_number).await;

        let summary = RunSummary {
            run_id: job.run_id,
            state,
            total: recipients.len(),
            success: tally.success,
            failed: tally.failed,
            deferred: recipients.len() - tally.attempted(),
            elapsed: started.elapsed(),
        };
        info!(
            run_id = %job.run_id,
            state = summary.state.as_str(),
            success = summary.success,
            failed = summary.failed,
            total = summary.total,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "dispatch run finished"
        );
        summary
    }

    fn chunk_delay(&self) -> Duration {
        let min = self.config.chunk_delay_min.as_millis() as u64;
        let max = self.config.chunk_delay_max.as_millis() as u64;
        if max <= min {
            return self.config.chunk_delay_min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}
