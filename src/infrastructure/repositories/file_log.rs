use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use crate::domain::{models::RunLogEntry, repositories::RunLogRepository};

/// Plain-text, newline-delimited run log. Lines are only ever appended.
pub struct FileRunLog {
    path: PathBuf,
    write: Mutex<()>,
}

impl FileRunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RunLogRepository for FileRunLog {
    async fn append(&self, entry: &RunLogEntry) -> anyhow::Result<()> {
        let _guard = self.write.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open run log {}", self.path.display()))?;

        let mut line = entry.to_line();
        line.push('\n');
        file.write_all(line.as_bytes())
            .await
            .context("failed to append run log line")?;
        file.flush().await.context("failed to flush run log")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::domain::models::RunState;

    fn entry(success: usize) -> RunLogEntry {
        RunLogEntry {
            timestamp: Utc::now(),
            operator: "operator".to_string(),
            state: RunState::Completed,
            elapsed: Duration::from_secs(3),
            success,
            failed: 0,
            total: success,
        }
    }

    #[tokio::test]
    async fn appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileRunLog::new(dir.path().join("dmblast_log.txt"));

        log.append(&entry(1)).await.unwrap();
        log.append(&entry(2)).await.unwrap();

        let contents = tokio::fs::read_to_string(log.path()).await.unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("successful=1 failed=0 total=1"));
        assert!(lines[1].ends_with("successful=2 failed=0 total=2"));
    }

    #[tokio::test]
    async fn keeps_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dmblast_log.txt");
        tokio::fs::write(&path, "older line\n").await.unwrap();

        FileRunLog::new(&path).append(&entry(5)).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("older line\n"));
        assert_eq!(contents.lines().count(), 2);
    }
}
