//! Error types for murmur-core.
//!
//! Every remote-facing failure is classified along two axes: fatal errors
//! must never be retried, retryable errors are worth another attempt. The
//! retry executor consumes [`Error::is_fatal`]; [`Error::is_retryable`] is
//! advisory and lets callers decide to defer work to the outbound queue.

use thiserror::Error;

/// Result type alias using murmur-core's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Remote service replied with a non-success HTTP status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Connection-level failure before any response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The request ran past its deadline.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The chat relay throttled us. Surfaced to the caller instead of
    /// being retried.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The chat relay refused for billing reasons; retrying cannot help.
    #[error("payment required: {0}")]
    QuotaExhausted(String),

    /// Input rejected before any remote call was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors that must never be retried: authentication, authorization and
    /// validation failures (the HTTP 400/401/403 class), plus the relay's
    /// rate-limit and billing refusals.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Api { status, .. } => matches!(status, 400 | 401 | 403),
            Error::RateLimited(_) | Error::QuotaExhausted(_) | Error::InvalidInput(_) => true,
            _ => false,
        }
    }

    /// Transient failures worth retrying: network drops, timeouts and
    /// server-side 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_decode() {
            // A malformed body is not transient; don't invite retries.
            Error::Other(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_class_is_fatal() {
        for status in [400, 401, 403] {
            let err = Error::Api {
                status,
                message: "denied".to_string(),
            };
            assert!(err.is_fatal(), "status {status} should be fatal");
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        for status in [500, 502, 503] {
            let err = Error::Api {
                status,
                message: "upstream".to_string(),
            };
            assert!(err.is_retryable(), "status {status} should be retryable");
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn test_network_and_timeout_are_retryable() {
        assert!(Error::Network("connection reset".to_string()).is_retryable());
        assert!(Error::Timeout("deadline exceeded".to_string()).is_retryable());
    }

    #[test]
    fn test_relay_refusals_are_fatal() {
        assert!(Error::RateLimited(String::new()).is_fatal());
        assert!(Error::QuotaExhausted(String::new()).is_fatal());
    }

    #[test]
    fn test_empty_message_is_not_fatal() {
        // An error carrying no message text must not be mistaken for an
        // authentication failure.
        let err = Error::Other(String::new());
        assert!(!err.is_fatal());
    }
}
