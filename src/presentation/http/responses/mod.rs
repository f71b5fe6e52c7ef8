use poem_openapi::Object;
use uuid::Uuid;

use crate::presentation::models::{DecisionKind, RunPhaseKind, RunStateKind};

#[derive(Object)]
pub struct BlastStartedDto {
    pub run_id: Uuid,
    pub recipients: u64,
    pub prompt: String,
}

#[derive(Object)]
pub struct DecisionAcceptedDto {
    pub run_id: Uuid,
    pub decision: DecisionKind,
}

#[derive(Object)]
pub struct ProgressDto {
    pub processed: u64,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub chunk: u64,
    pub chunk_count: u64,
    pub elapsed_secs: f64,
    pub rate_per_sec: f64,
    pub eta_secs: Option<f64>,
}

#[derive(Object)]
pub struct RunSummaryDto {
    pub state: RunStateKind,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub deferred: u64,
    pub elapsed_secs: f64,
}

#[derive(Object)]
pub struct RunDto {
    pub run_id: Uuid,
    pub operator: String,
    pub total: u64,
    pub phase: RunPhaseKind,
    /// Operator-facing status text.
    pub message: String,
    pub progress: Option<ProgressDto>,
    pub summary: Option<RunSummaryDto>,
    pub updated_at: String,
}

#[derive(Object)]
pub struct EmojiReloadDto {
    pub total: u64,
}
