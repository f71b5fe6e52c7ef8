use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::{ProgressSnapshot, RunTally};

#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub every_items: usize,
    pub every_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            every_items: 10,
            every_interval: Duration::from_secs(2),
        }
    }
}

/// Surface showing the single, edited-in-place progress message of a run.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, run_id: Uuid, snapshot: &ProgressSnapshot) -> anyhow::Result<()>;
}

/// Turns running totals into throttled progress updates for one run.
pub struct ProgressReporter {
    run_id: Uuid,
    sink: Arc<dyn ProgressSink>,
    config: ProgressConfig,
    total: usize,
    chunk_count: usize,
    started: Instant,
    last_emit_at: Instant,
    last_emit_processed: Option<usize>,
}

impl ProgressReporter {
    pub fn new(
        run_id: Uuid,
        sink: Arc<dyn ProgressSink>,
        config: ProgressConfig,
        total: usize,
        chunk_count: usize,
    ) -> Self {
        let now = Instant::now();
        Self {
            run_id,
            sink,
            config,
            total,
            chunk_count,
            started: now,
            last_emit_at: now,
            last_emit_processed: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self, tally: &RunTally, chunk: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: tally.processed(),
            total: self.total,
            success: tally.success,
            failed: tally.failed,
            elapsed: self.elapsed(),
            chunk,
            chunk_count: self.chunk_count,
        }
    }

    /// Publishes when enough items or enough time went by since the last
    /// publication.
    pub async fn observe(&mut self, tally: &RunTally, chunk: usize) {
        let processed = tally.processed();
        let since_items = processed.saturating_sub(self.last_emit_processed.unwrap_or(0));
        let due = since_items >= self.config.every_items.max(1)
            || self.last_emit_at.elapsed() >= self.config.every_interval
            || processed >= self.total;
        if due {
            self.emit(tally, chunk).await;
        }
    }

    /// Publishes the final totals regardless of cadence.
    pub async fn finish(&mut self, tally: &RunTally, chunk: usize) {
        if self.last_emit_processed != Some(tally.processed()) {
            self.emit(tally, chunk).await;
        }
    }

    async fn emit(&mut self, tally: &RunTally, chunk: usize) {
        let snapshot = self.snapshot(tally, chunk);
        if self
            .last_emit_processed
            .is_some_and(|last| snapshot.processed < last)
        {
            return;
        }
        self.last_emit_at = Instant::now();
        self.last_emit_processed = Some(snapshot.processed);
        if let Err(err) = self.sink.publish(self.run_id, &snapshot).await {
            debug!(run_id = %self.run_id, error = %err, "progress update dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::models::DeliveryOutcome;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn publish(&self, _run_id: Uuid, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(snapshot.processed);
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl ProgressSink for BrokenSink {
        async fn publish(&self, _run_id: Uuid, _snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
            anyhow::bail!("message was deleted")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn emits_every_ten_items_and_on_finish() {
        let sink = Arc::new(RecordingSink::default());
        let mut reporter =
            ProgressReporter::new(Uuid::new_v4(), sink.clone(), ProgressConfig::default(), 100, 1);

        let mut tally = RunTally::default();
        for _ in 0..25 {
            tally.record(&DeliveryOutcome::Sent);
            reporter.observe(&tally, 1).await;
        }
        reporter.finish(&tally, 1).await;

        assert_eq!(*sink.seen.lock().unwrap(), vec![10, 20, 25]);
    }

    #[tokio::test(start_paused = true)]
    async fn emits_after_interval_even_when_slow() {
        let sink = Arc::new(RecordingSink::default());
        let mut reporter =
            ProgressReporter::new(Uuid::new_v4(), sink.clone(), ProgressConfig::default(), 100, 1);

        let mut tally = RunTally::default();
        tally.record(&DeliveryOutcome::Sent);
        reporter.observe(&tally, 1).await;
        assert!(sink.seen.lock().unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(2)).await;
        tally.record(&DeliveryOutcome::QuotaExceeded);
        reporter.observe(&tally, 1).await;
        assert_eq!(*sink.seen.lock().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_failures_are_swallowed() {
        let mut reporter = ProgressReporter::new(
            Uuid::new_v4(),
            Arc::new(BrokenSink),
            ProgressConfig::default(),
            1,
            1,
        );
        let mut tally = RunTally::default();
        tally.record(&DeliveryOutcome::Sent);
        reporter.observe(&tally, 1).await;
        reporter.finish(&tally, 1).await;
    }
}
