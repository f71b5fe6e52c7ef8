use async_trait::async_trait;

use crate::domain::models::RunLogEntry;

/// Append-only record of executed runs.
#[async_trait]
pub trait RunLogRepository: Send + Sync {
    async fn append(&self, entry: &RunLogEntry) -> anyhow::Result<()>;
}
