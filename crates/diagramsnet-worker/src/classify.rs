//! Error taxonomy of a conversion and the classifier that builds it.

use diagramsnet_browser::{BrowserError, RenderError};
use thiserror::Error;
use tracing::error;

use crate::deadline::DeadlineExceeded;
use crate::images::ResolveError;

/// Summary reported for every input the rendering engine rejects.
pub const SYNTAX_ERROR_SUMMARY: &str = "Syntax error in graph";

/// A failure raised while rendering and inlining inside the deadline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Errors returned by [`Worker::convert`](crate::Worker::convert).
///
/// `Syntax` and `Timeout` are the known failure modes. Everything else
/// surfaces as `Infrastructure` with the browser error's own shape.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Rendering did not settle within the deadline.
    #[error("Timeout error: {action} took more than {deadline_ms}ms")]
    Timeout {
        deadline_ms: u64,
        action: &'static str,
    },

    /// The diagram could not be rendered. `message` is the cause's message.
    #[error("{message}")]
    Syntax {
        message: String,
        #[source]
        cause: PipelineError,
    },

    /// Session, navigation, or capture failure.
    #[error(transparent)]
    Infrastructure(#[from] BrowserError),
}

/// Coarse kind of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Timeout,
    Infrastructure,
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Timeout { .. } => ErrorKind::Timeout,
            ConvertError::Syntax { .. } => ErrorKind::Syntax,
            ConvertError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// Stable, user-facing title of the failure.
    pub fn title(&self) -> &'static str {
        match self {
            ConvertError::Timeout { .. } => "Timeout error",
            ConvertError::Syntax { .. } => SYNTAX_ERROR_SUMMARY,
            ConvertError::Infrastructure(_) => "Unable to convert the diagram",
        }
    }

    /// Whether retrying the same task may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ConvertError::Syntax { .. })
    }
}

impl From<DeadlineExceeded> for ConvertError {
    fn from(err: DeadlineExceeded) -> Self {
        ConvertError::Timeout {
            deadline_ms: err.deadline_ms,
            action: err.action,
        }
    }
}

/// Classify a render-pipeline failure as a syntax error.
///
/// The classification is logged here, before the caller gets a chance to wrap
/// or discard it.
pub fn classify(cause: PipelineError) -> ConvertError {
    let message = cause.to_string();
    error!(error = %message, "{}", SYNTAX_ERROR_SUMMARY);
    ConvertError::Syntax { message, cause }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_classify_keeps_engine_message() {
        let err = classify(PipelineError::from(RenderError::engine(
            "Not a diagram file",
        )));

        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.to_string(), "Not a diagram file");
        assert_eq!(err.title(), "Syntax error in graph");
        assert!(!err.is_retryable());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_classify_resolve_failure() {
        let err = classify(PipelineError::from(ResolveError::Cancelled));
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.to_string(), ResolveError::Cancelled.to_string());
    }

    #[test]
    fn test_timeout_from_deadline() {
        let err = ConvertError::from(DeadlineExceeded {
            deadline_ms: 15_000,
            action: "convert",
        });

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(
            err.to_string(),
            "Timeout error: convert took more than 15000ms"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_infrastructure_keeps_shape() {
        let err = ConvertError::from(BrowserError::Connect {
            endpoint: "ws://chrome:9222".to_string(),
            message: "connection refused".to_string(),
        });

        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(
            err.to_string(),
            "Failed to connect to browser at 'ws://chrome:9222': connection refused"
        );
        assert!(matches!(
            err,
            ConvertError::Infrastructure(BrowserError::Connect { .. })
        ));
    }
}
