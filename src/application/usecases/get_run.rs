use std::sync::Arc;

use uuid::Uuid;

use crate::{
    application::services::{
        authorization::OperatorPolicy,
        status_board::{RunRecord, RunStatusBoard},
    },
    domain::errors::DispatchError,
};

pub struct GetRunUseCase {
    board: Arc<RunStatusBoard>,
    policy: OperatorPolicy,
}

impl GetRunUseCase {
    pub fn new(board: Arc<RunStatusBoard>, policy: OperatorPolicy) -> Self {
        Self { board, policy }
    }

    pub async fn execute(&self, caller_id: &str, run_id: Uuid) -> Result<RunRecord, DispatchError> {
        self.policy.authorize(caller_id)?;
        self.board
            .get(run_id)
            .await
            .ok_or_else(|| DispatchError::NotFound(format!("run {run_id}")))
    }
}
