use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("You are not authorized to use this command.")]
    AuthorizationDenied,
    #[error("Invalid invocation: {0}")]
    InvocationMalformed(String),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Messaging endpoint error: {0}")]
    Endpoint(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure reported by the messaging endpoint for a single send call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("recipient does not accept direct messages")]
    Forbidden,
    #[error("recipient or channel not found")]
    NotFound,
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("http {status} (code {code:?}): {message}")]
    Http {
        status: u16,
        code: Option<u64>,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
}

impl SendError {
    /// Permanent per-recipient failures that are never retried.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SendError::Forbidden | SendError::NotFound)
    }
}
