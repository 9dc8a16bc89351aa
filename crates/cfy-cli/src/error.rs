//! CLI error types.

use std::time::Duration;

use cfy_rest::{ClientError, ExecutionId};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Execution or deployment not found on the manager.
    #[error("not found: {0}")]
    NotFound(String),

    /// Waiting for an execution exceeded the requested timeout.
    #[error("execution {execution_id} timed out after {}s", .elapsed.as_secs())]
    Timeout {
        /// Execution being waited on.
        execution_id: ExecutionId,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// The execution reached the `failed` status.
    #[error("execution {execution_id} failed: {error}")]
    ExecutionFailed {
        /// Failed execution.
        execution_id: ExecutionId,
        /// Error text reported by the manager.
        error: String,
    },

    /// Manager unreachable.
    #[error("transport error: {0}")]
    Transport(String),

    /// Workflow not defined for the deployment.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// The manager rejected a request.
    #[error("manager returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Manager message.
        message: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting or response decoding error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error whose details were already reported to the user.
    #[error("{0}")]
    Suppressed(Box<CliError>),
}

impl CliError {
    /// Mark this error as already reported.
    #[must_use]
    pub fn suppress(self) -> Self {
        match self {
            Self::Suppressed(_) => self,
            other => Self::Suppressed(Box::new(other)),
        }
    }

    /// Whether the user already saw a report for this error.
    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed(_))
    }

    /// The underlying error, looking through suppression.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Suppressed(inner) => inner.root(),
            other => other,
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(msg) => Self::NotFound(msg),
            ClientError::InvalidWorkflow(msg) => Self::InvalidWorkflow(msg),
            ClientError::Transport(msg) => Self::Transport(msg),
            ClientError::Api { status, message } => Self::Api { status, message },
            ClientError::Decode(msg) => Self::Format(format!("invalid manager response: {msg}")),
            ClientError::InvalidUrl(msg) => Self::Config(format!("invalid manager url: {msg}")),
        }
    }
}
