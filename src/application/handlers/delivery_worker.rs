use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::{
    application::services::{
        messenger::MessengerClient,
        rate_governor::{Admission, AdmissionPermit, DenyReason, RateGovernor},
    },
    domain::{
        errors::SendError,
        models::{DeliveryOutcome, DispatchJob, JobPart, Recipient},
    },
};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Retries allowed after a throttled attempt.
    pub throttle_retries: u32,
    /// Retry-after hints above this are not waited out.
    pub max_throttle_wait: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            throttle_retries: 1,
            max_throttle_wait: Duration::from_secs(60),
        }
    }
}

/// Delivers one job to one recipient under the governor's admission control.
pub struct DeliveryWorker {
    client: Arc<dyn MessengerClient>,
    governor: Arc<RateGovernor>,
    config: WorkerConfig,
}

impl DeliveryWorker {
    pub fn new(
        client: Arc<dyn MessengerClient>,
        governor: Arc<RateGovernor>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            client,
            governor,
            config,
        }
    }

    pub async fn attempt(&self, recipient: &Recipient, job: &DispatchJob) -> DeliveryOutcome {
        let parts = job.parts();
        let mut next_part = 0;
        let mut retries = 0;

        loop {
            // Once a part landed the recipient is charged and counts as attempted.
            let partially_delivered = next_part > 0;
            let admission = if partially_delivered {
                self.governor.admit_continuation(recipient.id).await
            } else {
                self.governor.admit(recipient.id).await
            };
            let mut permit = match admission {
                Admission::Allow(permit) => permit,
                Admission::Deny(DenyReason::QuotaExceeded { .. }) if !partially_delivered => {
                    return DeliveryOutcome::QuotaExceeded;
                }
                Admission::Deny(reason) => {
                    warn!(
                        run_id = %job.run_id,
                        recipient = %recipient.id,
                        delivered_parts = next_part,
                        ?reason,
                        "admission denied mid-delivery"
                    );
                    return DeliveryOutcome::UnexpectedFailure {
                        reason: match reason {
                            DenyReason::Closed => "dispatch is shutting down".to_string(),
                            DenyReason::QuotaExceeded { .. } => {
                                "daily quota exhausted mid-delivery".to_string()
                            }
                        },
                    };
                }
            };

            let outcome = self
                .deliver(&mut permit, recipient, &parts[next_part..], &mut next_part)
                .await;
            self.governor.record_result(permit, &outcome).await;

            match outcome {
                DeliveryOutcome::Throttled { retry_after }
                    if retries < self.config.throttle_retries
                        && retry_after <= self.config.max_throttle_wait =>
                {
                    retries += 1;
                    warn!(
                        run_id = %job.run_id,
                        recipient = %recipient.id,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "rate limited, retrying once"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                DeliveryOutcome::Throttled { retry_after } => {
                    warn!(
                        run_id = %job.run_id,
                        recipient = %recipient.id,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "rate limited again, giving up on recipient"
                    );
                    return DeliveryOutcome::Throttled { retry_after };
                }
                other => return other,
            }
        }
    }

    /// Sends the remaining parts in order, advancing `next_part` past every
    /// part the endpoint accepted.
    async fn deliver(
        &self,
        permit: &mut AdmissionPermit,
        recipient: &Recipient,
        parts: &[JobPart<'_>],
        next_part: &mut usize,
    ) -> DeliveryOutcome {
        for part in parts.iter().copied() {
            let result = match part {
                JobPart::Content(content) => {
                    self.client
                        .send_direct(recipient.id, Some(content), None)
                        .await
                }
                JobPart::Embed(embed) => {
                    self.client.send_direct(recipient.id, None, Some(embed)).await
                }
            };

            if let Err(err) = result {
                return Self::map_failure(recipient, err);
            }
            permit.mark_delivered();
            *next_part += 1;
        }
        DeliveryOutcome::Sent
    }

    fn map_failure(recipient: &Recipient, err: SendError) -> DeliveryOutcome {
        match err {
            SendError::RateLimited { retry_after } => DeliveryOutcome::Throttled { retry_after },
            err if err.is_unreachable() => {
                warn!(
                    recipient = %recipient.id,
                    name = %recipient.name,
                    error = %err,
                    "cannot send DM to recipient"
                );
                DeliveryOutcome::RecipientUnreachable {
                    reason: err.to_string(),
                }
            }
            err => {
                error!(
                    recipient = %recipient.id,
                    name = %recipient.name,
                    error = %err,
                    "error sending DM"
                );
                DeliveryOutcome::UnexpectedFailure {
                    reason: err.to_string(),
                }
            }
        }
    }
}
