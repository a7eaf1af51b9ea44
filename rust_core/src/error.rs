//! Error type shared by the upstream clients and the subscriber directory.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("HTTP request to {service} failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned non-2xx status {status}")]
    UpstreamStatus { service: &'static str, status: u16 },

    #[error("{service} circuit breaker is open")]
    CircuitOpen { service: &'static str },

    #[error("failed to decode {service} response: {reason}")]
    Decode { service: &'static str, reason: String },

    #[error("Telegram API error: {description}")]
    Telegram { description: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RelayError {
    /// Transport and upstream failures worth another attempt on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            RelayError::Http { .. } | RelayError::CircuitOpen { .. } => true,
            RelayError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            RelayError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            RelayError::Decode { .. } | RelayError::Telegram { .. } => false,
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
