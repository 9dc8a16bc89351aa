//! Error types for manager REST calls.

use thiserror::Error;

/// Marker the manager's search backend puts in a 500 body before any event
/// has been indexed for a fresh installation.
pub const INDEX_MISSING_MARKER: &str = "IndexMissingException";

/// Error code the manager returns when a deployment has no such workflow.
pub const NONEXISTENT_WORKFLOW_CODE: &str = "nonexistent_workflow_error";

/// Errors returned by [`crate::ManagerClient`] implementations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested resource does not exist on the manager.
    #[error("not found: {0}")]
    NotFound(String),

    /// The deployment does not define the requested workflow.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// The manager could not be reached, or answered with a gateway error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The manager rejected the request.
    #[error("manager returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The configured manager URL is unusable.
    #[error("invalid manager url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether this is the "events index not created yet" server error.
    #[must_use]
    pub fn is_index_missing(&self) -> bool {
        matches!(self, Self::Api { status: 500, message } if message.contains(INDEX_MISSING_MARKER))
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// Result type for manager REST calls.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_transient() {
        assert!(ClientError::Transport("connection refused".into()).is_transient());
        assert!(!ClientError::NotFound("exec-1".into()).is_transient());
        assert!(!ClientError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn index_missing_detection() {
        let err = ClientError::Api {
            status: 500,
            message: "IndexMissingException[[cloudify_events] missing]".into(),
        };
        assert!(err.is_index_missing());

        let other = ClientError::Api {
            status: 500,
            message: "internal error".into(),
        };
        assert!(!other.is_index_missing());

        let wrong_status = ClientError::Api {
            status: 400,
            message: INDEX_MISSING_MARKER.into(),
        };
        assert!(!wrong_status.is_index_missing());
    }

    #[test]
    fn display_api_error() {
        let err = ClientError::Api {
            status: 409,
            message: "conflict".into(),
        };
        assert_eq!(err.to_string(), "manager returned 409: conflict");
    }

    #[test]
    fn url_parse_error_converts() {
        let err: ClientError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }
}
