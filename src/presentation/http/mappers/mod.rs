use poem::http::StatusCode;

use crate::{
    application::services::status_board::{RunRecord, RunStatus},
    domain::{
        errors::DispatchError,
        models::{ProgressSnapshot, RunSummary},
    },
    presentation::{
        http::responses::{ProgressDto, RunDto, RunSummaryDto},
        models::RunPhaseKind,
    },
};

pub fn map_run(record: &RunRecord) -> RunDto {
    let (progress, summary) = match &record.status {
        RunStatus::AwaitingConfirmation { .. } => (None, None),
        RunStatus::Running { progress } => (progress.as_ref().map(map_progress), None),
        RunStatus::Finished(summary) => (None, Some(map_summary(summary))),
    };

    RunDto {
        run_id: record.run_id,
        operator: record.operator.clone(),
        total: record.total as u64,
        phase: RunPhaseKind::from(&record.status),
        message: record.message(),
        progress,
        summary,
        updated_at: record.updated_at.to_rfc3339(),
    }
}

pub fn map_progress(snapshot: &ProgressSnapshot) -> ProgressDto {
    ProgressDto {
        processed: snapshot.processed as u64,
        total: snapshot.total as u64,
        success: snapshot.success as u64,
        failed: snapshot.failed as u64,
        chunk: snapshot.chunk as u64,
        chunk_count: snapshot.chunk_count as u64,
        elapsed_secs: snapshot.elapsed.as_secs_f64(),
        rate_per_sec: snapshot.rate(),
        eta_secs: snapshot.eta().map(|eta| eta.as_secs_f64()),
    }
}

pub fn map_summary(summary: &RunSummary) -> RunSummaryDto {
    RunSummaryDto {
        state: summary.state.into(),
        total: summary.total as u64,
        success: summary.success as u64,
        failed: summary.failed as u64,
        deferred: summary.deferred as u64,
        elapsed_secs: summary.elapsed.as_secs_f64(),
    }
}

pub fn map_error(err: DispatchError) -> poem::Error {
    let status = match &err {
        DispatchError::AuthorizationDenied => StatusCode::FORBIDDEN,
        DispatchError::InvocationMalformed(_) => StatusCode::BAD_REQUEST,
        DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::Endpoint(_) => StatusCode::BAD_GATEWAY,
        DispatchError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    poem::Error::from_string(err.to_string(), status)
}
