//! Console forwarding from rendering pages.
//!
//! Pages report console output through a [`ConsoleHandler`]. Forwarding is
//! observational only: handlers never influence the render.

use tracing::{debug, error, info, warn};

use crate::protocol::{ConsoleLevel, ConsoleMessage};

/// Receives console messages emitted inside a page.
pub trait ConsoleHandler: Send + Sync {
    fn on_console(&self, message: ConsoleMessage);
}

/// Forwards page console output to the service log stream.
pub struct TracingConsoleHandler {
    task_id: String,
}

impl TracingConsoleHandler {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

impl ConsoleHandler for TracingConsoleHandler {
    fn on_console(&self, message: ConsoleMessage) {
        let task_id = self.task_id.as_str();
        let text = message.text.as_str();
        match message.level {
            ConsoleLevel::Debug => debug!(target: "diagramsnet::console", task_id, "{}", text),
            ConsoleLevel::Log | ConsoleLevel::Info => {
                info!(target: "diagramsnet::console", task_id, "{}", text)
            }
            ConsoleLevel::Warn => warn!(target: "diagramsnet::console", task_id, "{}", text),
            ConsoleLevel::Error => error!(target: "diagramsnet::console", task_id, "{}", text),
        }
    }
}
