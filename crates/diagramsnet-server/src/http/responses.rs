//! HTTP request and response types.

use serde::{Deserialize, Serialize};

/// Query parameters of the conversion endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertParams {
    /// Fetch and inline remote images referenced by the diagram.
    #[serde(default, rename = "unsafe")]
    pub allow_remote_images: bool,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short title of the failure.
    pub error: String,

    /// Detailed message.
    pub message: String,
}
