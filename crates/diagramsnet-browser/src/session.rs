//! Session and page traits implemented by browser backends.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::console::ConsoleHandler;
use crate::error::{BrowserError, RenderError};
use crate::protocol::RenderRequest;
use crate::types::{ScreenshotOptions, Viewport};

/// Opens sessions against a remote browser process.
#[async_trait]
pub trait BrowserConnector: Send + Sync {
    /// Open a new session against `endpoint`.
    ///
    /// Every call returns a fresh session; connectors never hand out a shared one.
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A connection to a remote browser process.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Create a new isolated page. Console output of the page goes to `console`.
    async fn new_page(
        &self,
        console: Arc<dyn ConsoleHandler>,
    ) -> Result<Box<dyn Page>, BrowserError>;

    /// Release the session. The remote browser keeps running.
    async fn disconnect(&self) -> Result<(), BrowserError>;
}

/// An isolated page inside a session.
#[async_trait]
pub trait Page: Send + Sync {
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), BrowserError>;

    /// Navigate to `url` and wait for the load to finish.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Run the rendering engine on `request` and return the serialized document.
    ///
    /// Implementations stop waiting as soon as `cancel` fires and return
    /// [`RenderError::Cancelled`].
    async fn render(
        &self,
        request: RenderRequest,
        cancel: CancellationToken,
    ) -> Result<String, RenderError>;

    /// Replace the page document with `html`.
    async fn set_content(&self, html: &str) -> Result<(), BrowserError>;

    /// Capture a snapshot of the first element matching `selector`.
    async fn screenshot(
        &self,
        selector: &str,
        options: ScreenshotOptions,
    ) -> Result<Vec<u8>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}
