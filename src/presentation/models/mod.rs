use poem_openapi::Enum;

use crate::{
    application::services::{confirmation::ConfirmationDecision, status_board::RunStatus},
    domain::models::RunState,
};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunPhaseKind {
    #[oai(rename = "awaiting_confirmation")]
    AwaitingConfirmation,
    #[oai(rename = "running")]
    Running,
    #[oai(rename = "finished")]
    Finished,
}

impl From<&RunStatus> for RunPhaseKind {
    fn from(value: &RunStatus) -> Self {
        match value {
            RunStatus::AwaitingConfirmation { .. } => RunPhaseKind::AwaitingConfirmation,
            RunStatus::Running { .. } => RunPhaseKind::Running,
            RunStatus::Finished(_) => RunPhaseKind::Finished,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunStateKind {
    #[oai(rename = "completed")]
    Completed,
    #[oai(rename = "cancelled")]
    Cancelled,
    #[oai(rename = "paused_quota_exceeded")]
    PausedQuotaExceeded,
}

impl From<RunState> for RunStateKind {
    fn from(value: RunState) -> Self {
        match value {
            RunState::Completed => RunStateKind::Completed,
            RunState::Cancelled => RunStateKind::Cancelled,
            RunState::PausedQuotaExceeded => RunStateKind::PausedQuotaExceeded,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum DecisionKind {
    #[oai(rename = "confirmed")]
    Confirmed,
    #[oai(rename = "declined")]
    Declined,
}

impl From<ConfirmationDecision> for DecisionKind {
    fn from(value: ConfirmationDecision) -> Self {
        match value {
            ConfirmationDecision::Confirmed => DecisionKind::Confirmed,
            ConfirmationDecision::Declined => DecisionKind::Declined,
        }
    }
}
