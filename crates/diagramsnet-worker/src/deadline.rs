//! Deadline race for the render step.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// The deadline elapsed before the operation settled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Timeout error: {action} took more than {deadline_ms}ms")]
pub struct DeadlineExceeded {
    pub deadline_ms: u64,
    pub action: &'static str,
}

/// Race `operation` against `deadline`.
///
/// The operation receives a token that is cancelled when the deadline wins,
/// so work it handed off elsewhere can stop instead of running on. Whatever
/// the operation yields is returned untouched, failures included.
pub async fn race_with_deadline<T, F, Fut>(
    operation: F,
    deadline: Duration,
    action: &'static str,
) -> Result<T, DeadlineExceeded>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = T>,
{
    let token = CancellationToken::new();
    let deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);

    tokio::select! {
        biased;
        output = operation(token.child_token()) => Ok(output),
        _ = tokio::time::sleep(deadline) => {
            token.cancel();
            warn!(action, deadline_ms, "Deadline elapsed, abandoning operation");
            Err(DeadlineExceeded { deadline_ms, action })
        }
    }
}
