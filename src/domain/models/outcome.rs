use std::time::Duration;

use serde::Serialize;

/// Result of one recipient's delivery attempt within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeliveryOutcome {
    Sent,
    RecipientUnreachable { reason: String },
    Throttled { retry_after: Duration },
    QuotaExceeded,
    UnexpectedFailure { reason: String },
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }

    /// Quota denials never reached the endpoint and do not count as attempts.
    pub fn is_attempted(&self) -> bool {
        !matches!(self, DeliveryOutcome::QuotaExceeded)
    }
}
