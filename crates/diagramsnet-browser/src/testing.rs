//! Scripted in-memory browser backend.
//!
//! `ScriptedBrowser` implements the session traits without a browser so the
//! worker and the HTTP service can be tested end to end. Every lifecycle call
//! is counted in a shared [`Recorder`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::console::ConsoleHandler;
use crate::error::{BrowserError, RenderError};
use crate::protocol::{ConsoleMessage, RenderRequest};
use crate::session::{BrowserConnector, BrowserSession, Page};
use crate::types::{ScreenshotOptions, Viewport};

/// First bytes of every PNG stream.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Document returned for well-formed diagrams.
pub const DIAGRAM_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="121px" height="61px" viewBox="-0.5 -0.5 121 61"><g><rect x="0" y="0" width="120" height="60" fill="#ffffff" stroke="#000000"/></g></svg>"##;

/// Engine message for sources that are not diagrams.
pub const NOT_A_DIAGRAM: &str = "Not a diagram file";

/// Sends page console output into a channel so tests can assert on it.
pub struct ChannelConsoleHandler {
    message_tx: mpsc::UnboundedSender<ConsoleMessage>,
}

impl ChannelConsoleHandler {
    /// Create a new handler with a message receiver.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConsoleMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { message_tx: tx }, rx)
    }
}

impl ConsoleHandler for ChannelConsoleHandler {
    fn on_console(&self, message: ConsoleMessage) {
        // Receiver might be dropped
        self.message_tx.send(message).ok();
    }
}

/// How the scripted page answers render calls.
#[derive(Debug, Clone)]
pub enum RenderBehavior {
    /// `<mxfile>` / `<mxGraphModel>` sources render to [`DIAGRAM_SVG`];
    /// anything else fails with [`NOT_A_DIAGRAM`].
    Diagram,
    /// Always return this document.
    Svg(String),
    /// Always fail with this engine message.
    Fail(String),
    /// Never answer; counts a cancelled render once the token fires.
    Hang,
    /// Wait, then behave like [`RenderBehavior::Diagram`].
    Delay(Duration),
}

#[derive(Debug, Clone)]
struct Script {
    render: RenderBehavior,
    console: Vec<ConsoleMessage>,
    fail_connect: bool,
    fail_new_page: bool,
    fail_goto: bool,
    fail_screenshot: bool,
    fail_close: bool,
    fail_disconnect: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            render: RenderBehavior::Diagram,
            console: Vec::new(),
            fail_connect: false,
            fail_new_page: false,
            fail_goto: false,
            fail_screenshot: false,
            fail_close: false,
            fail_disconnect: false,
        }
    }
}

/// Counters and captured inputs shared by every session of a [`ScriptedBrowser`].
#[derive(Debug, Default)]
pub struct Recorder {
    connects: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    disconnects: AtomicUsize,
    renders: AtomicUsize,
    cancelled_renders: AtomicUsize,
    screenshots: AtomicUsize,
    viewports: Mutex<Vec<Viewport>>,
    visited: Mutex<Vec<String>>,
    contents: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    /// Close attempts, failed ones included.
    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    /// Disconnect attempts, failed ones included.
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn cancelled_renders(&self) -> usize {
        self.cancelled_renders.load(Ordering::SeqCst)
    }

    pub fn screenshots(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }

    pub fn viewports(&self) -> Vec<Viewport> {
        lock(&self.viewports).clone()
    }

    pub fn visited(&self) -> Vec<String> {
        lock(&self.visited).clone()
    }

    /// Documents loaded through `set_content`.
    pub fn contents(&self) -> Vec<String> {
        lock(&self.contents).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Connector that hands out scripted sessions.
///
/// Failure switches apply to every session the connector opens.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBrowser {
    script: Script,
    recorder: Arc<Recorder>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render(mut self, behavior: RenderBehavior) -> Self {
        self.script.render = behavior;
        self
    }

    /// Console messages emitted by every render call.
    pub fn with_console(mut self, message: ConsoleMessage) -> Self {
        self.script.console.push(message);
        self
    }

    pub fn fail_connect(mut self) -> Self {
        self.script.fail_connect = true;
        self
    }

    pub fn fail_new_page(mut self) -> Self {
        self.script.fail_new_page = true;
        self
    }

    pub fn fail_goto(mut self) -> Self {
        self.script.fail_goto = true;
        self
    }

    pub fn fail_screenshot(mut self) -> Self {
        self.script.fail_screenshot = true;
        self
    }

    pub fn fail_close(mut self) -> Self {
        self.script.fail_close = true;
        self
    }

    pub fn fail_disconnect(mut self) -> Self {
        self.script.fail_disconnect = true;
        self
    }

    pub fn recorder(&self) -> Arc<Recorder> {
        Arc::clone(&self.recorder)
    }
}

#[async_trait]
impl BrowserConnector for ScriptedBrowser {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.script.fail_connect {
            return Err(BrowserError::Connect {
                endpoint: endpoint.to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.recorder.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script: self.script.clone(),
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

struct ScriptedSession {
    script: Script,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn new_page(
        &self,
        console: Arc<dyn ConsoleHandler>,
    ) -> Result<Box<dyn Page>, BrowserError> {
        if self.script.fail_new_page {
            return Err(BrowserError::NewPage("target crashed".to_string()));
        }
        self.recorder.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            script: self.script.clone(),
            recorder: Arc::clone(&self.recorder),
            console,
            content: Mutex::new(None),
        }))
    }

    async fn disconnect(&self) -> Result<(), BrowserError> {
        self.recorder.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_disconnect {
            return Err(BrowserError::Disconnect("socket already closed".to_string()));
        }
        Ok(())
    }
}

struct ScriptedPage {
    script: Script,
    recorder: Arc<Recorder>,
    console: Arc<dyn ConsoleHandler>,
    content: Mutex<Option<String>>,
}

impl ScriptedPage {
    fn render_diagram(xml: &str) -> Result<String, RenderError> {
        let trimmed = xml.trim_start();
        if trimmed.starts_with("<mxfile") || trimmed.starts_with("<mxGraphModel") {
            Ok(DIAGRAM_SVG.to_string())
        } else {
            Err(RenderError::engine(NOT_A_DIAGRAM))
        }
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), BrowserError> {
        lock(&self.recorder.viewports).push(viewport);
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        if self.script.fail_goto {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_FILE_NOT_FOUND".to_string(),
            });
        }
        lock(&self.recorder.visited).push(url.to_string());
        Ok(())
    }

    async fn render(
        &self,
        request: RenderRequest,
        cancel: CancellationToken,
    ) -> Result<String, RenderError> {
        self.recorder.renders.fetch_add(1, Ordering::SeqCst);
        for message in &self.script.console {
            self.console.on_console(message.clone());
        }

        match &self.script.render {
            RenderBehavior::Diagram => Self::render_diagram(&request.xml),
            RenderBehavior::Svg(svg) => Ok(svg.clone()),
            RenderBehavior::Fail(message) => Err(RenderError::engine(message.clone())),
            RenderBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Self::render_diagram(&request.xml)
            }
            RenderBehavior::Hang => {
                // The remote side outlives this future; it only learns about
                // the deadline through the token.
                let recorder = Arc::clone(&self.recorder);
                let watched = cancel.clone();
                tokio::spawn(async move {
                    watched.cancelled().await;
                    recorder.cancelled_renders.fetch_add(1, Ordering::SeqCst);
                });
                cancel.cancelled().await;
                Err(RenderError::Cancelled)
            }
        }
    }

    async fn set_content(&self, html: &str) -> Result<(), BrowserError> {
        lock(&self.recorder.contents).push(html.to_string());
        *lock(&self.content) = Some(html.to_string());
        Ok(())
    }

    async fn screenshot(
        &self,
        selector: &str,
        _options: ScreenshotOptions,
    ) -> Result<Vec<u8>, BrowserError> {
        self.recorder.screenshots.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_screenshot {
            return Err(BrowserError::Screenshot("capture timed out".to_string()));
        }
        let content = lock(&self.content).clone().unwrap_or_default();
        if !content.contains(&format!("<{selector}")) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&(content.len() as u32).to_be_bytes());
        Ok(png)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.recorder.pages_closed.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_close {
            return Err(BrowserError::Close("target already detached".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ConsoleLevel;

    #[tokio::test]
    async fn test_scripted_lifecycle_is_recorded() {
        let browser = ScriptedBrowser::new()
            .with_console(ConsoleMessage::new(ConsoleLevel::Info, "loaded"));
        let recorder = browser.recorder();
        let (handler, mut rx) = ChannelConsoleHandler::new();

        let session = browser.connect("ws://test").await.unwrap();
        let page = session.new_page(Arc::new(handler)).await.unwrap();
        page.set_viewport(Viewport::default()).await.unwrap();
        page.goto("file:///index.html").await.unwrap();
        let svg = page
            .render(RenderRequest::svg("<mxfile/>"), CancellationToken::new())
            .await
            .unwrap();
        page.close().await.unwrap();
        session.disconnect().await.unwrap();

        assert_eq!(svg, DIAGRAM_SVG);
        assert_eq!(rx.try_recv().unwrap().text, "loaded");
        assert_eq!(recorder.connects(), 1);
        assert_eq!(recorder.pages_opened(), 1);
        assert_eq!(recorder.pages_closed(), 1);
        assert_eq!(recorder.disconnects(), 1);
        assert_eq!(recorder.viewports(), vec![Viewport::new(600, 800)]);
        assert_eq!(recorder.visited(), vec!["file:///index.html".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_rejects_non_diagrams() {
        let browser = ScriptedBrowser::new();
        let (handler, _rx) = ChannelConsoleHandler::new();
        let session = browser.connect("ws://test").await.unwrap();
        let page = session.new_page(Arc::new(handler)).await.unwrap();

        let err = page
            .render(RenderRequest::svg("graph TD; A-->B"), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), NOT_A_DIAGRAM);
    }

    #[tokio::test]
    async fn test_screenshot_requires_element() {
        let browser = ScriptedBrowser::new();
        let (handler, _rx) = ChannelConsoleHandler::new();
        let session = browser.connect("ws://test").await.unwrap();
        let page = session.new_page(Arc::new(handler)).await.unwrap();

        let missing = page
            .screenshot("svg", ScreenshotOptions::transparent_png())
            .await;
        assert!(matches!(missing, Err(BrowserError::ElementNotFound(_))));

        page.set_content("<body><svg></svg></body>").await.unwrap();
        let png = page
            .screenshot("svg", ScreenshotOptions::transparent_png())
            .await
            .unwrap();
        assert!(png.starts_with(&PNG_SIGNATURE));
    }

    #[test]
    fn test_channel_handler_forwards_in_order() {
        let (handler, mut rx) = ChannelConsoleHandler::new();

        handler.on_console(ConsoleMessage::new(ConsoleLevel::Warn, "first"));
        handler.on_console(ConsoleMessage::new(ConsoleLevel::Error, "second"));

        assert_eq!(rx.try_recv().unwrap().text, "first");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.level, ConsoleLevel::Error);
        assert_eq!(second.text, "second");
    }

    #[test]
    fn test_channel_handler_ignores_dropped_receiver() {
        let (handler, rx) = ChannelConsoleHandler::new();
        drop(rx);
        handler.on_console(ConsoleMessage::new(ConsoleLevel::Log, "nobody listening"));
    }
}
