use std::sync::Arc;

use uuid::Uuid;

use crate::{
    application::services::{
        authorization::OperatorPolicy,
        confirmation::{ConfirmationDecision, PendingConfirmations},
    },
    domain::errors::DispatchError,
};

pub struct ResolveConfirmationUseCase {
    confirmations: Arc<PendingConfirmations>,
    policy: OperatorPolicy,
}

impl ResolveConfirmationUseCase {
    pub fn new(confirmations: Arc<PendingConfirmations>, policy: OperatorPolicy) -> Self {
        Self {
            confirmations,
            policy,
        }
    }

    pub fn execute(
        &self,
        caller_id: &str,
        run_id: Uuid,
        decision: ConfirmationDecision,
    ) -> Result<(), DispatchError> {
        self.policy.authorize(caller_id)?;
        self.confirmations.resolve(run_id, decision)
    }
}
