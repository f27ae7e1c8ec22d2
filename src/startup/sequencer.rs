//! Ordered and concurrent execution of startup steps.
//!
//! Every step is settled in isolation: an error or a panic inside a step
//! becomes a failed [`StepResult`] and the run moves on. The only thing that
//! stops a run before it starts is a malformed step list.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures_util::future::join_all;
use futures_util::FutureExt;
use tracing::{debug, info, warn};

use super::error::SequencerMisuse;
use super::report::{InitializationReport, Severity, StepResult};
use super::step::Step;

/// Lifecycle of a sequencer run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    NotStarted,
    Running,
    Completed,
}

/// Runs step lists and reports their outcomes.
///
/// # Example
/// ```ignore
/// let mut sequencer = Sequencer::new();
/// let report = sequencer
///     .run(vec![
///         Step::new("load-fonts", || async { Ok(()) }),
///         Step::new("init-storage", || async { Ok(()) }),
///     ])
///     .await?;
/// assert!(report.is_ready());
/// ```
#[derive(Debug, Default)]
pub struct Sequencer {
    state: RunState,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the most recent run
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!("Sequencer {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run `steps` strictly in declaration order.
    ///
    /// Step N+1 starts only after step N settles. Failed steps are recorded
    /// and never abort the run, so the returned report always covers every
    /// step and is always ready.
    pub async fn run(&mut self, steps: Vec<Step>) -> Result<InitializationReport, SequencerMisuse> {
        validate(&steps)?;

        self.transition(RunState::Running);
        info!("🚀 Running {} startup steps...", steps.len());

        let started = Instant::now();
        let mut report = InitializationReport::begin(steps.len());
        for step in steps {
            let (result, severity) = settle(step).await;
            report.record(result, severity);
        }
        report.complete(started.elapsed());

        self.transition(RunState::Completed);

        let failed = report.diagnostics().len();
        if failed == 0 {
            info!("✅ Startup complete in {:?}", started.elapsed());
        } else {
            warn!(
                "⚠️  Startup complete in {:?} with {} failed step(s)",
                started.elapsed(),
                failed
            );
        }

        Ok(report)
    }

    /// Start every step at once and wait for all of them to settle.
    ///
    /// Steps are polled on the calling task; no threads are spawned. A
    /// failing step does not cancel its siblings. Results follow declaration
    /// order, not completion order.
    pub async fn run_concurrent_group(
        &self,
        steps: Vec<Step>,
    ) -> Result<Vec<StepResult>, SequencerMisuse> {
        validate(&steps)?;

        debug!("Running concurrent group of {} steps", steps.len());
        let settled = join_all(steps.into_iter().map(settle)).await;

        Ok(settled.into_iter().map(|(result, _)| result).collect())
    }
}

fn validate(steps: &[Step]) -> Result<(), SequencerMisuse> {
    if steps.is_empty() {
        return Err(SequencerMisuse::EmptySteps);
    }

    let mut seen = HashSet::with_capacity(steps.len());
    for step in steps {
        if !seen.insert(step.name()) {
            return Err(SequencerMisuse::DuplicateStepName(step.name().to_string()));
        }
    }

    Ok(())
}

async fn settle(step: Step) -> (StepResult, Severity) {
    let (name, severity, future) = step.into_parts();
    debug!("▶ {}", name);

    let started = Instant::now();
    let outcome = AssertUnwindSafe(future).catch_unwind().await;
    let elapsed = started.elapsed();

    let result = match outcome {
        Ok(Ok(())) => {
            debug!("✔ {} ({:?})", name, elapsed);
            StepResult::success(name, elapsed)
        }
        Ok(Err(e)) => {
            let message = format!("{:#}", e);
            warn!("Step '{}' failed [{}]: {}", name, severity, message);
            StepResult::failure(name, message, elapsed)
        }
        Err(panic) => {
            let message = format!("panicked: {}", panic_message(panic.as_ref()));
            warn!("Step '{}' failed [{}]: {}", name, severity, message);
            StepResult::failure(name, message, elapsed)
        }
    };

    (result, severity)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
