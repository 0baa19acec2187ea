//! Shared application state.

use std::sync::Arc;

use diagramsnet_worker::Worker;

/// Shared application state.
pub struct AppState {
    /// Worker running every conversion.
    pub worker: Worker,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(worker: Worker) -> Arc<Self> {
        Arc::new(Self { worker })
    }
}
