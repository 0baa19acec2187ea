//! diagramsnet Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - The remote browser or its session protocol
//! - Network clients
//! - Runtime specifics
//!
//! All types here describe what a render task is and what it produces.

pub mod error;
pub mod format;
pub mod ids;
pub mod task;

// Re-export commonly used types
pub use error::CoreError;
pub use format::OutputFormat;
pub use ids::TaskId;
pub use task::{RenderResult, RenderTask};
