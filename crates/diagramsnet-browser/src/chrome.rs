//! DevTools backend built on `headless_chrome`.
//!
//! `headless_chrome` drives the remote browser with blocking calls, so every
//! call runs on tokio's blocking pool. A render abandoned through its
//! cancellation token keeps its blocking call alive until the page is closed.
//!
//! Console output is forwarded from the moment a page opens through
//! `Runtime.consoleAPICalled` events.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Emulation::SetDeviceMetricsOverride;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::protocol::cdp::Runtime;
use headless_chrome::{Browser, Tab};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::console::ConsoleHandler;
use crate::error::{BrowserError, RenderError};
use crate::protocol::{
    render_script, set_content_script, ConsoleLevel, ConsoleMessage, RenderReply, RenderRequest,
};
use crate::session::{BrowserConnector, BrowserSession, Page};
use crate::types::{ImageFormat, ScreenshotOptions, Viewport};

/// Per-call DevTools timeout when no render deadline is known.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Slack between the render deadline and the DevTools call timeout.
const CALL_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Connects to an already running Chrome through its DevTools WebSocket URL.
#[derive(Debug, Clone)]
pub struct ChromeConnector {
    call_timeout: Duration,
}

impl ChromeConnector {
    pub fn new() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Connector whose DevTools calls outlast `deadline`, so an overrun is
    /// always reported by the deadline race and never by the transport.
    pub fn for_deadline(deadline: Duration) -> Self {
        Self {
            call_timeout: deadline.saturating_add(CALL_TIMEOUT_MARGIN),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}

impl Default for ChromeConnector {
    fn default() -> Self {
        Self::new()
    }
}

async fn blocking<T, F>(call: F) -> Result<T, BrowserError>
where
    F: FnOnce() -> Result<T, BrowserError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| BrowserError::Protocol(format!("browser call panicked: {e}")))?
}

#[async_trait]
impl BrowserConnector for ChromeConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let ws_url = endpoint.to_string();
        let browser = blocking(move || {
            Browser::connect(ws_url.clone()).map_err(|e| BrowserError::Connect {
                endpoint: ws_url,
                message: e.to_string(),
            })
        })
        .await?;
        debug!(endpoint = %endpoint, "Connected to browser");

        Ok(Box::new(ChromeSession {
            browser: Mutex::new(Some(Arc::new(browser))),
            call_timeout: self.call_timeout,
        }))
    }
}

struct ChromeSession {
    browser: Mutex<Option<Arc<Browser>>>,
    call_timeout: Duration,
}

impl ChromeSession {
    fn browser(&self) -> Option<Arc<Browser>> {
        self.browser
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(
        &self,
        console: Arc<dyn ConsoleHandler>,
    ) -> Result<Box<dyn Page>, BrowserError> {
        let browser = self
            .browser()
            .ok_or_else(|| BrowserError::NewPage("session already released".to_string()))?;
        let call_timeout = self.call_timeout;
        let tab = blocking(move || {
            let tab = browser
                .new_tab()
                .map_err(|e| BrowserError::NewPage(e.to_string()))?;
            tab.set_default_timeout(call_timeout);
            Ok(tab)
        })
        .await?;

        let listener_tab = Arc::clone(&tab);
        let listener_console = Arc::clone(&console);
        let subscribed = blocking(move || forward_console(&listener_tab, listener_console)).await;
        let live_console = match subscribed {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Console events unavailable, falling back to render replies");
                false
            }
        };

        Ok(Box::new(ChromePage {
            tab,
            console,
            live_console,
        }))
    }

    async fn disconnect(&self) -> Result<(), BrowserError> {
        let browser = self
            .browser
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(browser) = browser {
            // Dropping the last handle closes the DevTools transport.
            blocking(move || {
                drop(browser);
                Ok(())
            })
            .await?;
            info!("Disconnected from browser");
        }
        Ok(())
    }
}

/// Subscribe `console` to every console API call made in `tab`.
fn forward_console(tab: &Arc<Tab>, console: Arc<dyn ConsoleHandler>) -> Result<(), BrowserError> {
    tab.call_method(Runtime::Enable(None))
        .map_err(|e| BrowserError::Protocol(e.to_string()))?;
    tab.add_event_listener(Arc::new(move |event: &Event| {
        if let Event::RuntimeConsoleAPICalled(called) = event {
            if let Some(message) = serde_json::to_value(&called.params)
                .ok()
                .and_then(|params| console_message(&params))
            {
                console.on_console(message);
            }
        }
    }))
    .map_err(|e| BrowserError::Protocol(e.to_string()))?;
    Ok(())
}

/// Build a console message from `Runtime.consoleAPICalled` parameters.
fn console_message(params: &serde_json::Value) -> Option<ConsoleMessage> {
    let level = params
        .get("type")
        .and_then(serde_json::Value::as_str)
        .map(|kind| ConsoleLevel::from(kind.to_string()))
        .unwrap_or_default();
    let text = params
        .get("args")?
        .as_array()?
        .iter()
        .filter_map(remote_text)
        .collect::<Vec<_>>()
        .join(" ");
    Some(ConsoleMessage::new(level, text))
}

/// Printable form of a `Runtime.RemoteObject`.
fn remote_text(object: &serde_json::Value) -> Option<String> {
    match object.get("value") {
        Some(serde_json::Value::String(text)) => Some(text.clone()),
        Some(serde_json::Value::Null) | None => object
            .get("description")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        Some(other) => Some(other.to_string()),
    }
}

struct ChromePage {
    tab: Arc<Tab>,
    console: Arc<dyn ConsoleHandler>,
    /// Console events already reach `console` as they happen.
    live_console: bool,
}

impl ChromePage {
    async fn evaluate(&self, script: String) -> Result<Option<serde_json::Value>, BrowserError> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.evaluate(&script, false)
                .map(|remote| remote.value)
                .map_err(|e| BrowserError::Protocol(e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), BrowserError> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.call_method(SetDeviceMetricsOverride {
                width: viewport.width,
                height: viewport.height,
                device_scale_factor: 1.0,
                mobile: false,
                scale: None,
                screen_width: None,
                screen_height: None,
                position_x: None,
                position_y: None,
                dont_set_visible_size: None,
                screen_orientation: None,
                viewport: None,
                display_feature: None,
                device_posture: None,
            })
            .map(|_| ())
            .map_err(|e| BrowserError::Viewport(e.to_string()))
        })
        .await
    }

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();
        blocking(move || {
            tab.navigate_to(&url)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| BrowserError::Navigation {
                    url,
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn render(
        &self,
        request: RenderRequest,
        cancel: CancellationToken,
    ) -> Result<String, RenderError> {
        let script = render_script(&request)?;
        let value = tokio::select! {
            _ = cancel.cancelled() => return Err(RenderError::Cancelled),
            value = self.evaluate(script) => value?,
        };

        let raw = match value {
            Some(serde_json::Value::String(raw)) => raw,
            other => {
                return Err(RenderError::engine(format!(
                    "unexpected render result: {}",
                    other.unwrap_or(serde_json::Value::Null)
                )))
            }
        };

        let (outcome, console) = RenderReply::parse(&raw)?.into_parts();
        if !self.live_console {
            for message in console {
                self.console.on_console(message);
            }
        }
        outcome
    }

    async fn set_content(&self, html: &str) -> Result<(), BrowserError> {
        let script =
            set_content_script(html).map_err(|e| BrowserError::Content(e.to_string()))?;
        self.evaluate(script)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Content(e.to_string()))
    }

    async fn screenshot(
        &self,
        selector: &str,
        options: ScreenshotOptions,
    ) -> Result<Vec<u8>, BrowserError> {
        let tab = Arc::clone(&self.tab);
        let selector = selector.to_string();
        blocking(move || {
            if options.omit_background {
                tab.set_transparent_background_color()
                    .map_err(|e| BrowserError::Screenshot(e.to_string()))?;
            }
            let element = tab
                .find_element(&selector)
                .map_err(|_| BrowserError::ElementNotFound(selector.clone()))?;
            let format = match options.format {
                ImageFormat::Png => CaptureScreenshotFormatOption::Png,
            };
            element
                .capture_screenshot(format)
                .map_err(|e| BrowserError::Screenshot(e.to_string()))
        })
        .await
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.close(false)
                .map(|_| ())
                .map_err(|e| BrowserError::Close(e.to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_timeout_outlasts_deadline() {
        let deadline = Duration::from_millis(15_000);
        let connector = ChromeConnector::for_deadline(deadline);
        assert!(connector.call_timeout() > deadline);

        let long = Duration::from_secs(120);
        assert!(ChromeConnector::for_deadline(long).call_timeout() > long);
        assert!(ChromeConnector::for_deadline(long).call_timeout() > DEFAULT_CALL_TIMEOUT);
    }

    #[test]
    fn test_console_message_from_event_params() {
        let params = json!({
            "type": "warning",
            "args": [
                {"type": "string", "value": "font missing:"},
                {"type": "number", "value": 3},
                {"type": "object", "description": "Error: stencil"}
            ],
            "executionContextId": 1,
            "timestamp": 1.0
        });

        let message = console_message(&params).unwrap();
        assert_eq!(message.level, ConsoleLevel::Warn);
        assert_eq!(message.text, "font missing: 3 Error: stencil");
    }

    #[test]
    fn test_console_message_without_args_is_skipped() {
        assert!(console_message(&json!({"type": "log"})).is_none());
    }
}
