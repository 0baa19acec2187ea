//! Output formats a render task can produce.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Requested output format of a render task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Serialized vector document.
    #[default]
    Svg,
    /// Rasterized snapshot of the vector document.
    Png,
}

impl OutputFormat {
    /// MIME type of the rendered output.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Svg => "image/svg+xml",
            OutputFormat::Png => "image/png",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
