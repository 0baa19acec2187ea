//! Task identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Random identifier of a render task.
///
/// Only used to correlate log lines; it carries no meaning for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a new random (v4) TaskId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for TaskId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
