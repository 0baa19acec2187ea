//! Plain value types shared by every backend.

use serde::{Deserialize, Serialize};

/// Page viewport in CSS pixels.
///
/// Rasterization captures this surface, so it bounds the size of PNG output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 600,
            height: 800,
        }
    }
}

/// Image encoding for element snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
}

/// Options for capturing a snapshot of a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotOptions {
    pub format: ImageFormat,

    /// Render the page background as fully transparent.
    pub omit_background: bool,
}

impl ScreenshotOptions {
    /// PNG with a transparent background.
    pub fn transparent_png() -> Self {
        Self {
            format: ImageFormat::Png,
            omit_background: true,
        }
    }
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            omit_background: false,
        }
    }
}
