//! Worker settings read from the command line and the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use diagramsnet_worker::{WorkerConfig, DEFAULT_CONVERT_TIMEOUT_MS};

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct WorkerArgs {
    /// DevTools WebSocket URL of the remote browser
    #[arg(
        long,
        global = true,
        env = "DIAGRAMSNET_BROWSER_ENDPOINT",
        default_value = "ws://127.0.0.1:9222"
    )]
    pub browser_endpoint: String,

    /// URL of the diagrams.net rendering page (defaults to the bundled page)
    #[arg(long, global = true, env = "DIAGRAMSNET_PAGE_URL")]
    pub page_url: Option<String>,

    /// Directory holding the bundled rendering page; ignored when a page URL is given
    #[arg(long, global = true, env = "DIAGRAMSNET_ASSETS_DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Render deadline in milliseconds
    #[arg(
        long,
        global = true,
        env = "DIAGRAMSNET_CONVERT_TIMEOUT",
        default_value_t = DEFAULT_CONVERT_TIMEOUT_MS
    )]
    pub convert_timeout: u64,
}

impl WorkerArgs {
    pub fn worker_config(&self) -> WorkerConfig {
        let config = WorkerConfig::default()
            .with_browser_endpoint(&self.browser_endpoint)
            .with_convert_timeout(Duration::from_millis(self.convert_timeout));
        match (&self.page_url, &self.assets_dir) {
            (Some(url), _) => config.with_page_url(url),
            (None, Some(dir)) => config.with_page_url(WorkerConfig::page_url_in(dir)),
            (None, None) => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        worker: WorkerArgs,
    }

    #[test]
    fn test_explicit_arguments() {
        let cli = TestCli::try_parse_from([
            "diagramsnet",
            "--browser-endpoint",
            "ws://chrome:3000/devtools/browser/1",
            "--page-url",
            "http://drawio/index.html",
            "--convert-timeout",
            "500",
        ])
        .unwrap();

        let config = cli.worker.worker_config();
        assert_eq!(config.browser_endpoint, "ws://chrome:3000/devtools/browser/1");
        assert_eq!(config.page_url, "http://drawio/index.html");
        assert_eq!(config.convert_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_page_url_falls_back_to_bundled_page() {
        let args = WorkerArgs {
            browser_endpoint: "ws://127.0.0.1:9222".to_string(),
            page_url: None,
            assets_dir: None,
            convert_timeout: DEFAULT_CONVERT_TIMEOUT_MS,
        };

        let config = args.worker_config();
        assert_eq!(config.page_url, WorkerConfig::bundled_page_url());
        assert_eq!(config.convert_timeout, Duration::from_millis(15_000));
    }

    #[test]
    fn test_assets_dir_sets_page_url() {
        let cli = TestCli::try_parse_from(["diagramsnet", "--assets-dir", "/opt/drawio"]).unwrap();

        let config = cli.worker.worker_config();
        assert_eq!(config.page_url, "file:///opt/drawio/index.html");
    }

    #[test]
    fn test_page_url_wins_over_assets_dir() {
        let cli = TestCli::try_parse_from([
            "diagramsnet",
            "--assets-dir",
            "/opt/drawio",
            "--page-url",
            "http://drawio/index.html",
        ])
        .unwrap();

        let config = cli.worker.worker_config();
        assert_eq!(config.page_url, "http://drawio/index.html");
    }

    #[test]
    fn test_rejects_non_numeric_timeout() {
        let result = TestCli::try_parse_from(["diagramsnet", "--convert-timeout", "soon"]);
        assert!(result.is_err());
    }
}
