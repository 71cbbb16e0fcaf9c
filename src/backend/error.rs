//! Error types for synthesis backend calls.
//!
//! None of these escape the synthesis pipeline: the producer boundary turns
//! every [`BackendError`] into an absent result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success HTTP status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Underlying transport failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The payload arrived but cannot be used (undecodable, empty set, wrong stage count).
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The producer declined to produce anything.
    #[error("producer unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = BackendError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "API error (status 503): overloaded");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackendError>();
    }
}
