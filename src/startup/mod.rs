//! Startup sequencing.
//!
//! The sequencer runs a declared list of asynchronous steps and turns their
//! outcomes into an [`InitializationReport`]:
//! - [`Sequencer::run`] - steps one after another, in declaration order
//! - [`Sequencer::run_concurrent_group`] - independent steps all at once
//!
//! Step failures are data, not errors. A run always completes with a report
//! whose readiness flag is set, and the caller decides what a failed step
//! means for the UI.

mod error;
mod report;
mod sequencer;
mod step;

pub use error::{SequencerMisuse, StepTimedOut};
pub use report::{Diagnostic, InitializationReport, Severity, StepResult};
pub use sequencer::{RunState, Sequencer};
pub use step::{Step, StepFuture};
