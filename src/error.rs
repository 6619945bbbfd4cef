// src/error.rs

use thiserror::Error;

/// Failure of a Request Gateway call.
///
/// Every gateway operation returns `Result<T, GatewayError>`; the caller
/// decides whether to log-and-degrade or escalate. Nothing is swallowed
/// inside the gateway itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status. `detail` carries the
    /// backend's `{"detail": ...}` message when present, otherwise the raw
    /// response body.
    #[error("backend error {status}: {detail}")]
    Backend { status: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Failure of an Operation Log call.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid status type: '{0}'")]
    InvalidStatus(String),
}
