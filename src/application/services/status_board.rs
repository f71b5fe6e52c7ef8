use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::progress::ProgressSink;
use crate::domain::models::{ProgressSnapshot, RunSummary};

#[derive(Debug, Clone)]
pub enum RunStatus {
    AwaitingConfirmation { prompt: String },
    Running { progress: Option<ProgressSnapshot> },
    Finished(RunSummary),
}

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub operator: String,
    pub total: usize,
    pub status: RunStatus,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    /// The text the operator sees for this run.
    pub fn message(&self) -> String {
        match &self.status {
            RunStatus::AwaitingConfirmation { prompt } => prompt.clone(),
            RunStatus::Running { progress: None } => "Starting DM blast...".to_string(),
            RunStatus::Running {
                progress: Some(snapshot),
            } => snapshot.to_string(),
            RunStatus::Finished(summary) => summary.to_string(),
        }
    }
}

/// Finished runs kept for status queries before the oldest are dropped.
pub const DEFAULT_FINISHED_RETENTION: usize = 500;

#[derive(Default)]
struct Runs {
    records: HashMap<Uuid, RunRecord>,
    finished: VecDeque<Uuid>,
}

/// Latest known state of every run started by this process. Each run owns a
/// single entry that is edited in place. Runs still awaiting confirmation or
/// running are always kept; finished ones are evicted oldest first.
pub struct RunStatusBoard {
    runs: RwLock<Runs>,
    finished_retention: usize,
}

impl Default for RunStatusBoard {
    fn default() -> Self {
        Self::with_retention(DEFAULT_FINISHED_RETENTION)
    }
}

impl RunStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(finished_retention: usize) -> Self {
        Self {
            runs: RwLock::new(Runs::default()),
            finished_retention,
        }
    }

    pub async fn open(&self, run_id: Uuid, operator: &str, total: usize, prompt: String) {
        let record = RunRecord {
            run_id,
            operator: operator.to_string(),
            total,
            status: RunStatus::AwaitingConfirmation { prompt },
            updated_at: Utc::now(),
        };
        self.runs.write().await.records.insert(run_id, record);
    }

    pub async fn set_status(&self, run_id: Uuid, status: RunStatus) {
        let mut runs = self.runs.write().await;
        let finished = matches!(status, RunStatus::Finished(_));
        let Some(record) = runs.records.get_mut(&run_id) else {
            return;
        };
        let was_finished = matches!(record.status, RunStatus::Finished(_));
        record.status = status;
        record.updated_at = Utc::now();

        if finished && !was_finished {
            runs.finished.push_back(run_id);
            while runs.finished.len() > self.finished_retention {
                if let Some(evicted) = runs.finished.pop_front() {
                    runs.records.remove(&evicted);
                    debug!(run_id = %evicted, "evicted finished run from board");
                }
            }
        }
    }

    pub async fn get(&self, run_id: Uuid) -> Option<RunRecord> {
        self.runs.read().await.records.get(&run_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.records.len()
    }
}

#[async_trait]
impl ProgressSink for RunStatusBoard {
    async fn publish(&self, run_id: Uuid, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        let mut runs = self.runs.write().await;
        let record = runs
            .records
            .get_mut(&run_id)
            .ok_or_else(|| anyhow::anyhow!("run {run_id} is not on the board"))?;
        record.status = RunStatus::Running {
            progress: Some(*snapshot),
        };
        record.updated_at = Utc::now();

        info!(
            run_id = %run_id,
            processed = snapshot.processed,
            total = snapshot.total,
            success = snapshot.success,
            failed = snapshot.failed,
            rate = snapshot.rate(),
            "dispatch progress"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn finish(board: &RunStatusBoard, run_id: Uuid) {
        board
            .set_status(run_id, RunStatus::Finished(RunSummary::cancelled(run_id, 1)))
            .await;
    }

    #[tokio::test]
    async fn oldest_finished_runs_are_evicted() {
        let board = RunStatusBoard::with_retention(2);
        let runs: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let active = Uuid::new_v4();
        board.open(active, "op", 1, "?".to_string()).await;
        for run_id in &runs {
            board.open(*run_id, "op", 1, "?".to_string()).await;
            finish(&board, *run_id).await;
        }

        assert!(board.get(runs[0]).await.is_none());
        assert!(board.get(runs[1]).await.is_some());
        assert!(board.get(runs[2]).await.is_some());
        assert!(board.get(active).await.is_some());
        assert_eq!(board.len().await, 3);
    }

    #[tokio::test]
    async fn progress_updates_the_record_in_place() {
        let board = RunStatusBoard::new();
        let run_id = Uuid::new_v4();
        board.open(run_id, "op", 4, "Send?".to_string()).await;

        let snapshot = ProgressSnapshot {
            processed: 2,
            total: 4,
            success: 2,
            failed: 0,
            elapsed: Duration::from_secs(1),
            chunk: 1,
            chunk_count: 1,
        };
        board.publish(run_id, &snapshot).await.unwrap();

        let record = board.get(run_id).await.unwrap();
        assert!(record.message().starts_with("Progress: 2/4"));
        assert!(board.publish(Uuid::new_v4(), &snapshot).await.is_err());
    }
}
