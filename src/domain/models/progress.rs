use std::fmt;
use std::time::Duration;

/// Observational view of a run's running totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub chunk: usize,
    pub chunk_count: usize,
}

impl ProgressSnapshot {
    /// Items per second since the run started.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / secs
    }

    /// `None` while nothing has been processed yet.
    pub fn eta(&self) -> Option<Duration> {
        let rate = self.rate();
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.processed) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eta = match self.eta() {
            Some(eta) => format!("{}s", eta.as_secs()),
            None => "unknown".to_string(),
        };
        write!(
            f,
            "Progress: {}/{}\nCurrent Chunk: {}/{}\nSuccessful: {} | Failed: {}\nRate: {:.2}/s | ETA: {}",
            self.processed,
            self.total,
            self.chunk,
            self.chunk_count,
            self.success,
            self.failed,
            self.rate(),
            eta
        )
    }
}
