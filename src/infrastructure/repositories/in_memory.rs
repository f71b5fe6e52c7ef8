use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{models::RunLogEntry, repositories::RunLogRepository};

#[derive(Default)]
pub struct InMemoryRunLog {
    entries: RwLock<Vec<RunLogEntry>>,
}

impl InMemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<RunLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl RunLogRepository for InMemoryRunLog {
    async fn append(&self, entry: &RunLogEntry) -> anyhow::Result<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }
}
