use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::outcome::DeliveryOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Completed,
    Cancelled,
    PausedQuotaExceeded,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Completed => "completed",
            RunState::Cancelled => "cancelled",
            RunState::PausedQuotaExceeded => "paused (quota exceeded)",
        }
    }
}

/// Running totals of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub success: usize,
    pub failed: usize,
    pub deferred: usize,
}

impl RunTally {
    pub fn record(&mut self, outcome: &DeliveryOutcome) {
        if !outcome.is_attempted() {
            self.deferred += 1;
        } else if outcome.is_sent() {
            self.success += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn attempted(&self) -> usize {
        self.success + self.failed
    }

    pub fn processed(&self) -> usize {
        self.success + self.failed + self.deferred
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub state: RunState,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub deferred: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn cancelled(run_id: Uuid, total: usize) -> Self {
        Self {
            run_id,
            state: RunState::Cancelled,
            total,
            success: 0,
            failed: 0,
            deferred: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn attempted(&self) -> usize {
        self.success + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            RunState::Cancelled => write!(f, "DM blast cancelled."),
            RunState::Completed => write!(
                f,
                "DM blast completed.\nSuccessful: {}\nFailed: {}\nTotal: {}\nElapsed: {:.1}s",
                self.success,
                self.failed,
                self.total,
                self.elapsed.as_secs_f64()
            ),
            RunState::PausedQuotaExceeded => write!(
                f,
                "DM blast paused: daily quota exceeded.\nSuccessful: {}\nFailed: {}\nNot attempted: {}\nTotal: {}\nElapsed: {:.1}s",
                self.success,
                self.failed,
                self.total.saturating_sub(self.attempted()),
                self.total,
                self.elapsed.as_secs_f64()
            ),
        }
    }
}

/// One line of the durable run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogEntry {
    pub timestamp: DateTime<Utc>,
    pub operator: String,
    pub state: RunState,
    pub elapsed: Duration,
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

impl RunLogEntry {
    pub fn from_summary(operator: &str, summary: &RunSummary) -> Self {
        Self {
            timestamp: Utc::now(),
            operator: operator.to_string(),
            state: summary.state,
            elapsed: summary.elapsed,
            success: summary.success,
            failed: summary.failed,
            total: summary.total,
        }
    }

    /// Single newline-free line; the writer appends the terminator.
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {} - {} elapsed={:.1}s successful={} failed={} total={}",
            self.timestamp.to_rfc3339(),
            self.operator,
            self.state.as_str(),
            self.elapsed.as_secs_f64(),
            self.success,
            self.failed,
            self.total
        )
    }
}
