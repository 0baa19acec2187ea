//! Error types for the browser boundary.

use thiserror::Error;

/// Errors raised by the browser session, page lifecycle, or capture path.
///
/// These are infrastructure failures: none of them say anything about the
/// diagram the user submitted.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Could not open a session against the remote browser.
    #[error("Failed to connect to browser at '{endpoint}': {message}")]
    Connect { endpoint: String, message: String },

    /// Could not create a page inside the session.
    #[error("Failed to open page: {0}")]
    NewPage(String),

    /// Could not size the page viewport.
    #[error("Failed to set viewport: {0}")]
    Viewport(String),

    /// Navigation to the rendering surface failed.
    #[error("Navigation to '{url}' failed: {message}")]
    Navigation { url: String, message: String },

    /// Could not load a document into the page.
    #[error("Failed to set page content: {0}")]
    Content(String),

    /// Selector matched nothing in the page.
    #[error("Element '{0}' not found")]
    ElementNotFound(String),

    /// Capturing a snapshot failed.
    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    /// Closing the page failed.
    #[error("Failed to close page: {0}")]
    Close(String),

    /// Releasing the session failed.
    #[error("Failed to disconnect from browser: {0}")]
    Disconnect(String),

    /// Lower-level protocol or backend failure.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Errors raised while the rendering engine runs inside a page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The rendering engine rejected the input.
    ///
    /// The message is the engine's own, untouched.
    #[error("{message}")]
    Engine { message: String },

    /// The page answered with something that is not a render reply.
    #[error("Invalid render reply: {0}")]
    Reply(#[from] serde_json::Error),

    /// The caller stopped waiting for the render.
    #[error("Render cancelled")]
    Cancelled,

    /// The page failed underneath the render call.
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl RenderError {
    pub fn engine(message: impl Into<String>) -> Self {
        RenderError::Engine {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_keeps_message() {
        let err = RenderError::engine("Not a diagram file");
        assert_eq!(err.to_string(), "Not a diagram file");
    }

    #[test]
    fn test_browser_error_is_transparent() {
        let err = RenderError::from(BrowserError::Protocol("socket closed".to_string()));
        assert_eq!(err.to_string(), "Protocol error: socket closed");
    }
}
