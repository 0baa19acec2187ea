//! Inlining of remote raster images referenced by rendered SVG.
//!
//! Resolution is snapshot-then-mutate: one pass collects every image
//! reference, the remote ones are fetched one after another, and a second pass
//! rewrites the document. A single failed fetch fails the whole resolution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use quick_xml::escape::unescape;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Attributes holding an image reference, in lookup order.
const REFERENCE_ATTRIBUTES: [&str; 2] = ["xlink:href", "href"];

/// Removed from every image so inlined images never catch pointer events.
const POINTER_ATTRIBUTE: &str = "pointer-events";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors that can occur while inlining images.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A reference could not be turned into a fetchable URL.
    #[error("Invalid image reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Fetching a referenced image failed.
    #[error("Failed to fetch image '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The document could not be parsed or rewritten.
    #[error("Failed to rewrite vector document: {0}")]
    Rewrite(String),

    /// The deadline fired while images were still being fetched.
    #[error("Image resolution cancelled")]
    Cancelled,
}

/// Fetches remote images and rewrites their references as `data:` URIs.
#[derive(Debug, Clone, Default)]
pub struct ImageResolver {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl ImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative references against `base_url`, the document they
    /// were rendered in.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Inline every non-embedded image reference of `document`.
    ///
    /// Embedded references are left as they are. `pointer-events` is stripped
    /// from every image. In-flight fetches are dropped as soon as `cancel`
    /// fires.
    pub async fn resolve_images(
        &self,
        document: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ResolveError> {
        let references = collect_references(document)?;

        // Keyed by the attribute value as written, entities included.
        let mut inlined: HashMap<String, String> = HashMap::new();
        for reference in references {
            if is_embedded(&reference) || inlined.contains_key(&reference) {
                continue;
            }
            let url = self.locate(&reference)?;
            let data_uri = tokio::select! {
                _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                fetched = self.fetch_inline(url) => fetched?,
            };
            inlined.insert(reference, data_uri);
        }

        let rewritten = rewrite_references(document, &inlined)?;
        info!(images = inlined.len(), "Inlined remote images");
        Ok(rewritten)
    }

    /// Decode character references and resolve against the base URL.
    fn locate(&self, reference: &str) -> Result<Url, ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidReference {
            reference: reference.to_string(),
            reason,
        };

        let decoded = unescape(reference).map_err(|e| invalid(e.to_string()))?;
        let url = match &self.base_url {
            Some(base) => base.join(&decoded),
            None => Url::parse(&decoded),
        };
        url.map_err(|e| invalid(e.to_string()))
    }

    async fn fetch_inline(&self, url: Url) -> Result<String, ResolveError> {
        let fetch_error = |source| ResolveError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(fetch_error)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await.map_err(fetch_error)?;

        debug!(
            url = %url,
            content_type = %content_type,
            bytes = bytes.len(),
            "Fetched image"
        );
        Ok(format!(
            "data:{};base64,{}",
            content_type,
            STANDARD.encode(&bytes)
        ))
    }
}

fn is_embedded(reference: &str) -> bool {
    reference.starts_with("data:")
}

/// First reference attribute present on an element, with its value.
fn reference_of(get: impl Fn(&str) -> Option<String>) -> Option<(&'static str, String)> {
    REFERENCE_ATTRIBUTES
        .iter()
        .find_map(|name| get(name).map(|value| (*name, value)))
}

fn collect_references(document: &str) -> Result<Vec<String>, ResolveError> {
    let references = Rc::new(RefCell::new(Vec::new()));

    rewrite_str(
        document,
        RewriteStrSettings {
            element_content_handlers: vec![element!("image", {
                let references = Rc::clone(&references);
                move |el| {
                    if let Some((_, reference)) = reference_of(|name| el.get_attribute(name)) {
                        references.borrow_mut().push(reference);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ResolveError::Rewrite(e.to_string()))?;

    let collected = references.borrow().clone();
    Ok(collected)
}

fn rewrite_references(
    document: &str,
    inlined: &HashMap<String, String>,
) -> Result<String, ResolveError> {
    rewrite_str(
        document,
        RewriteStrSettings {
            element_content_handlers: vec![element!("image", move |el| {
                if let Some((attribute, reference)) = reference_of(|name| el.get_attribute(name))
                {
                    if let Some(data_uri) = inlined.get(&reference) {
                        el.set_attribute(attribute, data_uri)?;
                    }
                }
                el.remove_attribute(POINTER_ATTRIBUTE);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ResolveError::Rewrite(e.to_string()))
}
