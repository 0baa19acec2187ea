//! Message contract between the worker and the rendering page.
//!
//! The render call crosses an execution boundary: the worker sends a
//! serializable [`RenderRequest`] and the page answers with a JSON-encoded
//! [`RenderReply`]. Nothing else is shared between the two sides.

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Request handed to the rendering engine's `render` capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Diagram description.
    pub xml: String,

    /// Engine output format. Always `"svg"` for this worker.
    pub format: String,
}

impl RenderRequest {
    /// Request a vector document for `xml`.
    pub fn svg(xml: impl Into<String>) -> Self {
        Self {
            xml: xml.into(),
            format: "svg".to_string(),
        }
    }
}

/// Severity of a console message emitted inside the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ConsoleLevel {
    Debug,
    #[default]
    Log,
    Info,
    Warn,
    Error,
}

impl From<String> for ConsoleLevel {
    fn from(level: String) -> Self {
        match level.as_str() {
            "debug" | "trace" => ConsoleLevel::Debug,
            "info" => ConsoleLevel::Info,
            "warn" | "warning" => ConsoleLevel::Warn,
            "error" | "assert" => ConsoleLevel::Error,
            _ => ConsoleLevel::Log,
        }
    }
}

/// A console message captured inside the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    #[serde(default)]
    pub level: ConsoleLevel,
    pub text: String,
}

impl ConsoleMessage {
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Reply produced by [`render_script`] inside the page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderReply {
    /// Serialized vector document on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,

    /// Engine error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Console output captured while rendering.
    #[serde(default)]
    pub console: Vec<ConsoleMessage>,
}

impl RenderReply {
    /// Decode the raw JSON string returned by the page.
    pub fn parse(raw: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Split the reply into the render outcome and the captured console output.
    pub fn into_parts(self) -> (Result<String, RenderError>, Vec<ConsoleMessage>) {
        let outcome = match (self.svg, self.error) {
            (_, Some(message)) => Err(RenderError::Engine { message }),
            (Some(svg), None) => Ok(svg),
            (None, None) => Err(RenderError::engine(
                "rendering surface returned no document",
            )),
        };
        (outcome, self.console)
    }
}

/// Build the expression evaluated inside the page for one render call.
///
/// The expression evaluates to a JSON string that decodes as [`RenderReply`].
/// Engine exceptions are caught in the page and reported through `error`, so
/// the evaluation itself only fails on transport problems.
pub fn render_script(request: &RenderRequest) -> Result<String, serde_json::Error> {
    let request = serde_json::to_string(request)?;
    Ok(format!(
        r#"(() => {{
  const request = {request};
  const captured = [];
  const levels = ['debug', 'log', 'info', 'warn', 'error'];
  const original = {{}};
  for (const level of levels) {{
    original[level] = console[level];
    console[level] = (...args) => {{
      captured.push({{ level, text: args.map((arg) => String(arg)).join(' ') }});
      original[level].apply(console, args);
    }};
  }}
  try {{
    const root = render(request).getSvg();
    const svg = new XMLSerializer().serializeToString(root);
    return JSON.stringify({{ svg, console: captured }});
  }} catch (err) {{
    const error = err && err.message !== undefined ? String(err.message) : String(err);
    return JSON.stringify({{ error, console: captured }});
  }} finally {{
    for (const level of levels) {{
      console[level] = original[level];
    }}
  }}
}})()"#
    ))
}

/// Build the expression that replaces the page document with `html`.
pub fn set_content_script(html: &str) -> Result<String, serde_json::Error> {
    let html = serde_json::to_string(html)?;
    Ok(format!(
        "(() => {{ document.open(); document.write({html}); document.close(); return true; }})()"
    ))
}
