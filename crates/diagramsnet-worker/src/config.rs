//! Worker configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use diagramsnet_browser::Viewport;
use url::Url;

/// Default render deadline in milliseconds.
pub const DEFAULT_CONVERT_TIMEOUT_MS: u64 = 15_000;

const ASSETS_DIR: &str = "assets";

const PAGE_FILE: &str = "index.html";

/// Worker configuration.
///
/// Read once when the worker is built; tasks never consult the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// DevTools WebSocket URL of the remote browser.
    pub browser_endpoint: String,

    /// Location of the page exposing the `render` capability.
    pub page_url: String,

    /// Deadline for the render-and-inline step.
    pub convert_timeout: Duration,

    /// Viewport of every page; bounds PNG output.
    pub viewport: Viewport,
}

impl WorkerConfig {
    pub fn with_browser_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.browser_endpoint = endpoint.into();
        self
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = url.into();
        self
    }

    pub fn with_convert_timeout(mut self, timeout: Duration) -> Self {
        self.convert_timeout = timeout;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// The bundled rendering page, located when the process starts.
    ///
    /// Looks in `assets/` next to the executable first, then in `assets/`
    /// under the working directory.
    pub fn bundled_page_url() -> String {
        Self::page_url_in(&default_assets_dir())
    }

    /// File URL of the rendering page inside `assets_dir`.
    pub fn page_url_in(assets_dir: &Path) -> String {
        let page = assets_dir.join(PAGE_FILE);
        let page = if page.is_absolute() {
            page
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&page))
                .unwrap_or(page)
        };
        match Url::from_file_path(&page) {
            Ok(url) => url.to_string(),
            Err(()) => format!("file://{}", page.display()),
        }
    }
}

fn default_assets_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(ASSETS_DIR)))
        .filter(|dir| dir.join(PAGE_FILE).is_file())
        .unwrap_or_else(|| PathBuf::from(ASSETS_DIR))
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            browser_endpoint: "ws://127.0.0.1:9222".to_string(),
            page_url: Self::bundled_page_url(),
            convert_timeout: Duration::from_millis(DEFAULT_CONVERT_TIMEOUT_MS),
            viewport: Viewport::default(),
        }
    }
}
