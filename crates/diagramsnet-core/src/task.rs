//! Render task and result types.

use crate::{CoreError, OutputFormat, TaskId};
use serde::{Deserialize, Serialize};

/// A RenderTask is one request to turn a diagram description into an image.
///
/// Tasks are immutable once built: the worker only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTask {
    /// Identifier used to correlate log lines.
    id: TaskId,

    /// Diagram description (untrusted).
    source: String,

    /// Whether remote images referenced by the rendered document may be fetched and inlined.
    is_unsafe: bool,

    /// Requested output format.
    format: OutputFormat,
}

impl RenderTask {
    /// Create a new RenderTask.
    ///
    /// Fails with [`CoreError::EmptySource`] when `source` is empty.
    pub fn new(source: impl Into<String>, format: OutputFormat) -> Result<Self, CoreError> {
        let source = source.into();
        if source.is_empty() {
            return Err(CoreError::EmptySource);
        }
        Ok(Self {
            id: TaskId::generate(),
            source,
            is_unsafe: false,
            format,
        })
    }

    /// Builder method to allow fetching remote images.
    pub fn with_unsafe(mut self, is_unsafe: bool) -> Self {
        self.is_unsafe = is_unsafe;
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_unsafe(&self) -> bool {
        self.is_unsafe
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_png(&self) -> bool {
        self.format == OutputFormat::Png
    }
}

/// Output of a successful render task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    /// UTF-8 serialized vector document.
    Svg(String),
    /// PNG bytes with a transparent background.
    Png(Vec<u8>),
}

impl RenderResult {
    pub fn format(&self) -> OutputFormat {
        match self {
            RenderResult::Svg(_) => OutputFormat::Svg,
            RenderResult::Png(_) => OutputFormat::Png,
        }
    }

    /// MIME type of the payload.
    pub fn content_type(&self) -> &'static str {
        self.format().content_type()
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            RenderResult::Svg(svg) => svg.len(),
            RenderResult::Png(png) => png.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the result and return the raw payload.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RenderResult::Svg(svg) => svg.into_bytes(),
            RenderResult::Png(png) => png,
        }
    }
}
