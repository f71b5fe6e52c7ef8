use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::info;
use uuid::Uuid;

use crate::domain::errors::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfirmationDecision {
    Confirmed,
    Declined,
}

/// Yes/no authorization for a single run.
pub trait ConfirmationGate: Send + Sync {
    /// Registers the prompt right away; the returned handle resolves once
    /// the operator answers or the prompt expires.
    fn open(&self, run_id: Uuid, prompt: String) -> PendingDecision;
}

type Prompts = Arc<Mutex<HashMap<Uuid, Prompt>>>;

struct Prompt {
    text: String,
    reply: oneshot::Sender<ConfirmationDecision>,
}

fn lock(prompts: &Prompts) -> MutexGuard<'_, HashMap<Uuid, Prompt>> {
    prompts.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct PendingDecision {
    run_id: Uuid,
    reply: oneshot::Receiver<ConfirmationDecision>,
    timeout: Duration,
    prompts: Prompts,
}

impl PendingDecision {
    /// No answer within the timeout counts as a decline.
    pub async fn wait(self) -> ConfirmationDecision {
        let decision = match tokio::time::timeout(self.timeout, self.reply).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(_)) => ConfirmationDecision::Declined,
            Err(_) => {
                info!(run_id = %self.run_id, "confirmation timed out");
                ConfirmationDecision::Declined
            }
        };
        lock(&self.prompts).remove(&self.run_id);
        decision
    }
}

/// Prompts awaiting an answer through the HTTP surface.
pub struct PendingConfirmations {
    timeout: Duration,
    prompts: Prompts,
}

impl PendingConfirmations {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            prompts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn resolve(&self, run_id: Uuid, decision: ConfirmationDecision) -> Result<(), DispatchError> {
        let prompt = lock(&self.prompts)
            .remove(&run_id)
            .ok_or_else(|| DispatchError::NotFound(format!("no pending confirmation for run {run_id}")))?;
        prompt.reply.send(decision).map_err(|_| {
            DispatchError::NotFound(format!("confirmation for run {run_id} already expired"))
        })
    }

    pub fn prompt(&self, run_id: Uuid) -> Option<String> {
        lock(&self.prompts).get(&run_id).map(|p| p.text.clone())
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

impl ConfirmationGate for PendingConfirmations {
    fn open(&self, run_id: Uuid, prompt: String) -> PendingDecision {
        let (tx, rx) = oneshot::channel();
        lock(&self.prompts).insert(run_id, Prompt { text: prompt, reply: tx });
        PendingDecision {
            run_id,
            reply: rx,
            timeout: self.timeout,
            prompts: Arc::clone(&self.prompts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn confirm_resolves_pending_prompt() {
        let gate = PendingConfirmations::new(Duration::from_secs(120));
        let run_id = Uuid::new_v4();
        let pending = gate.open(run_id, "Send to 3 members?".to_string());
        assert_eq!(gate.prompt(run_id).as_deref(), Some("Send to 3 members?"));

        gate.resolve(run_id, ConfirmationDecision::Confirmed).unwrap();
        assert_eq!(pending.wait().await, ConfirmationDecision::Confirmed);
        assert_eq!(gate.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_is_a_decline() {
        let gate = PendingConfirmations::new(Duration::from_secs(120));
        let run_id = Uuid::new_v4();
        let pending = gate.open(run_id, "?".to_string());

        assert_eq!(pending.wait().await, ConfirmationDecision::Declined);
        assert_eq!(gate.pending_count(), 0);
        assert!(matches!(
            gate.resolve(run_id, ConfirmationDecision::Confirmed),
            Err(DispatchError::NotFound(_))
        ));
    }

    #[test]
    fn second_answer_is_rejected() {
        let gate = PendingConfirmations::new(Duration::from_secs(120));
        let run_id = Uuid::new_v4();
        let _pending = gate.open(run_id, "?".to_string());

        gate.resolve(run_id, ConfirmationDecision::Declined).unwrap();
        assert!(gate.resolve(run_id, ConfirmationDecision::Confirmed).is_err());
    }
}
