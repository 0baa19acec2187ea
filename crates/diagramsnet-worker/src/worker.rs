//! Render task orchestration.

use std::sync::Arc;
use std::time::Instant;

use diagramsnet_browser::{
    BrowserConnector, BrowserSession, ConsoleHandler, Page, RenderRequest, ScreenshotOptions,
    TracingConsoleHandler,
};
use diagramsnet_core::{RenderResult, RenderTask};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::classify::{classify, ConvertError, PipelineError};
use crate::config::WorkerConfig;
use crate::deadline::race_with_deadline;
use crate::images::ImageResolver;

/// Action name reported in timeout messages.
pub const CONVERT_ACTION: &str = "convert";

/// Selector of the element captured for PNG output.
const SNAPSHOT_SELECTOR: &str = "svg";

/// Wrap a rendered SVG in the minimal page used for rasterization.
pub fn host_document(svg: &str) -> String {
    format!(
        "<!DOCTYPE html>
<html>
<head>
<meta name='viewport' content='initial-scale=1.0, user-scalable=no' />
<meta http-equiv='Content-Type' content='text/html; charset=utf-8' />
</head>
<body>
{}
</body>
</html>",
        svg
    )
}

/// Converts render tasks using a remote browser.
///
/// Each task gets its own session and page; nothing is shared between
/// concurrent conversions except the configuration and the HTTP client.
#[derive(Clone)]
pub struct Worker {
    config: WorkerConfig,
    connector: Arc<dyn BrowserConnector>,
    resolver: ImageResolver,
}

impl Worker {
    pub fn new(config: WorkerConfig, connector: Arc<dyn BrowserConnector>) -> Self {
        // Relative image references resolve against the page they were rendered in.
        let resolver = match Url::parse(&config.page_url) {
            Ok(base) => ImageResolver::new().with_base_url(base),
            Err(e) => {
                warn!(page_url = %config.page_url, error = %e, "Page URL is not absolute");
                ImageResolver::new()
            }
        };
        Self {
            config,
            connector,
            resolver,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Convert a diagram to the format the task asks for.
    ///
    /// The page is closed and the session released exactly once whatever the
    /// outcome; teardown failures are logged and never change the result.
    /// Teardown runs when the returned future completes, so callers that may
    /// drop it early should drive it on a spawned task.
    #[instrument(
        name = "convert",
        skip_all,
        fields(task_id = %task.id(), format = %task.format(), unsafe_images = task.is_unsafe())
    )]
    pub async fn convert(&self, task: &RenderTask) -> Result<RenderResult, ConvertError> {
        let started = Instant::now();

        let session = self.connector.connect(&self.config.browser_endpoint).await?;
        debug!(endpoint = %self.config.browser_endpoint, "Browser session opened");

        let console: Arc<dyn ConsoleHandler> =
            Arc::new(TracingConsoleHandler::new(task.id().to_string()));
        let page = match session.new_page(console).await {
            Ok(page) => page,
            Err(e) => {
                release_session(session.as_ref()).await;
                return Err(e.into());
            }
        };

        let result = self.run(page.as_ref(), task).await;

        close_page(page.as_ref()).await;
        release_session(session.as_ref()).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(output) => info!(bytes = output.len(), elapsed_ms, "Conversion completed"),
            Err(e) => warn!(kind = ?e.kind(), error = %e, elapsed_ms, "Conversion failed"),
        }
        result
    }

    async fn run(&self, page: &dyn Page, task: &RenderTask) -> Result<RenderResult, ConvertError> {
        page.set_viewport(self.config.viewport).await?;
        page.goto(&self.config.page_url).await?;

        let svg = race_with_deadline(
            |cancel| self.render_svg(page, task, cancel),
            self.config.convert_timeout,
            CONVERT_ACTION,
        )
        .await?
        .map_err(classify)?;

        if !task.is_png() {
            return Ok(RenderResult::Svg(svg));
        }

        page.set_content(&host_document(&svg)).await?;
        let png = page
            .screenshot(SNAPSHOT_SELECTOR, ScreenshotOptions::transparent_png())
            .await?;
        Ok(RenderResult::Png(png))
    }

    async fn render_svg(
        &self,
        page: &dyn Page,
        task: &RenderTask,
        cancel: CancellationToken,
    ) -> Result<String, PipelineError> {
        let svg = page
            .render(RenderRequest::svg(task.source()), cancel.clone())
            .await?;
        if !task.is_unsafe() {
            return Ok(svg);
        }
        Ok(self.resolver.resolve_images(&svg, &cancel).await?)
    }
}

async fn close_page(page: &dyn Page) {
    if let Err(e) = page.close().await {
        warn!(error = %e, "Unable to close the page");
    }
}

async fn release_session(session: &dyn BrowserSession) {
    if let Err(e) = session.disconnect().await {
        warn!(error = %e, "Unable to disconnect from the browser");
    }
}
