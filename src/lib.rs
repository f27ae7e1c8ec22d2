//! Safeguard startup sequencing.
//!
//! Runs the application's initialization pipeline with per-step failure
//! isolation and reports readiness as an explicit value:
//! - [`startup`] - the sequencer, steps and the initialization report
//! - [`permissions`] - concurrent permission requests with per-capability outcomes
//! - [`fonts`], [`storage`], [`journal`] - collaborators the default pipeline calls
//! - [`bootstrap`] - the default pipeline and the presentation decision

pub mod bootstrap;
pub mod config;
pub mod fonts;
pub mod journal;
pub mod permissions;
pub mod startup;
pub mod storage;
