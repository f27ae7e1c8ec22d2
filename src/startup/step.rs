//! Named asynchronous unit of startup work.

use std::future::Future;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::error::StepTimedOut;
use super::report::Severity;

/// Future a step settles with
pub type StepFuture = BoxFuture<'static, anyhow::Result<()>>;

/// One named step handed to the [`Sequencer`](super::Sequencer).
///
/// The closure is not called until the sequencer starts the step, so
/// building a step list has no side effects.
pub struct Step {
    name: String,
    severity: Severity,
    timeout: Option<Duration>,
    execute: Box<dyn FnOnce() -> StepFuture + Send>,
}

impl Step {
    pub fn new<F, Fut>(name: impl Into<String>, execute: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            severity: Severity::default(),
            timeout: None,
            // Defer the call into the future so a panic while building it is
            // caught together with panics while polling it.
            execute: Box::new(move || async move { execute().await }.boxed()),
        }
    }

    /// Severity attached to this step's diagnostic if it fails
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Fail the step with [`StepTimedOut`] if it has not settled within `limit`.
    ///
    /// This is the step's own policy; the sequencer never imposes deadlines.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn into_parts(self) -> (String, Severity, StepFuture) {
        let future = (self.execute)();
        let future = match self.timeout {
            Some(limit) => async move {
                match tokio::time::timeout(limit, future).await {
                    Ok(result) => result,
                    Err(_) => Err(StepTimedOut(limit).into()),
                }
            }
            .boxed(),
            None => future,
        };
        (self.name, self.severity, future)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("timeout", &self.timeout)
            .finish()
    }
}
