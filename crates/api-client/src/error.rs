use std::time::Duration;
use thiserror::Error;

/// The outcome of a single failed request attempt, classified so the caller
/// can decide whether to retry.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Rate limit exceeded (HTTP 429){}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("Server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),

    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {}s", d.as_secs()),
        None => String::new(),
    }
}

impl ApiError {
    /// Failures worth retrying with a short delay: network trouble and 5xx.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Server { .. })
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }

    /// The server-suggested wait, if this was a 429 carrying `Retry-After`.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
