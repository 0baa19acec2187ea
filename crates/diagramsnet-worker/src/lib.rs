//! diagramsnet render worker
//!
//! This crate turns a [`RenderTask`](diagramsnet_core::RenderTask) into a
//! [`RenderResult`](diagramsnet_core::RenderResult) using a remote browser:
//!
//! - **Worker**: opens a session and page per task, renders under a deadline,
//!   rasterizes when asked, and always tears the page and session down
//! - **Deadline**: races the render against a timer and cancels the loser
//! - **Classification**: maps render failures to `Syntax`, deadline expiry to
//!   `Timeout`, and leaves infrastructure failures untouched
//! - **Images**: inlines remote raster images referenced by the rendered SVG
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use diagramsnet_browser::BrowserConnector;
//! use diagramsnet_core::{OutputFormat, RenderTask};
//! use diagramsnet_worker::{Worker, WorkerConfig};
//!
//! async fn run(connector: Arc<dyn BrowserConnector>) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WorkerConfig::default()
//!         .with_browser_endpoint("ws://127.0.0.1:9222/devtools/browser/abc");
//!     let worker = Worker::new(config, connector);
//!
//!     let task = RenderTask::new("<mxfile>...</mxfile>", OutputFormat::Svg)?;
//!     let svg = worker.convert(&task).await?;
//!     println!("{} bytes", svg.len());
//!     Ok(())
//! }
//! ```

mod classify;
mod config;
mod deadline;
mod images;
mod worker;

pub use classify::{classify, ConvertError, ErrorKind, PipelineError, SYNTAX_ERROR_SUMMARY};
pub use config::{WorkerConfig, DEFAULT_CONVERT_TIMEOUT_MS};
pub use deadline::{race_with_deadline, DeadlineExceeded};
pub use images::{ImageResolver, ResolveError};
pub use worker::{host_document, Worker, CONVERT_ACTION};
