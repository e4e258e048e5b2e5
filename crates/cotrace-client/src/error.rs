//! Client error types.

use thiserror::Error;

/// Errors surfaced by the registration and upload client.
///
/// Transport failures are opaque: the client does not interpret status
/// codes beyond success or failure, and never retries on its own. The
/// scheduling collaborator owns retry and backoff policy.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The network or backend was unreachable or rejected the request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("Unexpected response status: {status}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: u16,
    },

    /// A success response did not carry the expected body.
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong with the body.
        reason: String,
    },

    /// An endpoint URL could not be built.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// A local store operation failed while completing the call.
    #[error(transparent)]
    Core(#[from] cotrace_core::CoreError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A specialized [`Result`] type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ClientError>();
        assert_sync::<ClientError>();
    }

    #[test]
    fn test_display_messages() {
        let err = ClientError::UnexpectedStatus { status: 429 };
        assert!(format!("{err}").contains("429"));

        let err = ClientError::MalformedResponse {
            reason: "missing field 'id'".into(),
        };
        assert!(format!("{err}").contains("missing field 'id'"));
    }
}
