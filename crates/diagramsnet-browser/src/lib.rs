//! Remote browser boundary for diagramsnet.
//!
//! This crate describes everything the render worker needs from a browser:
//! a session per task, an isolated page per session, and a message-passing
//! render call into the page. The orchestration itself lives in
//! `diagramsnet-worker`; this crate only knows how to talk to a browser.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use diagramsnet_browser::{
//!     BrowserConnector, ConsoleHandler, RenderRequest, TracingConsoleHandler, Viewport,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! async fn render_once(
//!     connector: &dyn BrowserConnector,
//! ) -> Result<String, Box<dyn std::error::Error>> {
//!     let session = connector.connect("ws://127.0.0.1:9222/devtools/browser/abc").await?;
//!     let console: Arc<dyn ConsoleHandler> = Arc::new(TracingConsoleHandler::new("example"));
//!     let page = session.new_page(console).await?;
//!     page.set_viewport(Viewport::default()).await?;
//!     page.goto("file:///srv/drawio/index.html").await?;
//!     let svg = page
//!         .render(RenderRequest::svg("<mxfile/>"), CancellationToken::new())
//!         .await?;
//!     page.close().await?;
//!     session.disconnect().await?;
//!     Ok(svg)
//! }
//! ```

mod console;
mod error;
mod protocol;
mod session;
mod types;

#[cfg(feature = "chrome")]
pub mod chrome;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use console::{ConsoleHandler, TracingConsoleHandler};
pub use error::{BrowserError, RenderError};
pub use protocol::{
    render_script, set_content_script, ConsoleLevel, ConsoleMessage, RenderReply, RenderRequest,
};
pub use session::{BrowserConnector, BrowserSession, Page};
pub use types::{ImageFormat, ScreenshotOptions, Viewport};
