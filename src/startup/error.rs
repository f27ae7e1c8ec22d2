//! Errors raised by the sequencer itself.
//!
//! Step failures never surface here: they are captured in the
//! [`InitializationReport`](super::InitializationReport). The only error a
//! caller can receive from the sequencer is a wiring mistake.

use std::time::Duration;

use thiserror::Error;

/// Precondition violation in the step list handed to the sequencer.
///
/// Detected before any step executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerMisuse {
    /// No steps were supplied
    #[error("step list is empty")]
    EmptySteps,
    /// Two steps share the same name
    #[error("duplicate step name: {0}")]
    DuplicateStepName(String),
}

/// A step exceeded the deadline it declared with
/// [`Step::with_timeout`](super::Step::with_timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out after {0:?}")]
pub struct StepTimedOut(pub Duration);
