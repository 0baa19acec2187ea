//! Core domain errors.

use thiserror::Error;

/// Core domain errors for diagramsnet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The diagram source was empty.
    #[error("Body must not be empty.")]
    EmptySource,
}
