//! Outcome of one startup run.
//!
//! The report is built by the sequencer only. Everything outside the
//! `startup` module sees it through read accessors.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// How serious a step failure is for the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_duration_ms<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

/// Settled outcome of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub name: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_duration_ms")]
    pub duration: Option<Duration>,
}

impl StepResult {
    pub fn success(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            succeeded: true,
            error: None,
            duration: Some(duration),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            succeeded: false,
            error: Some(error.into()),
            duration: Some(duration),
        }
    }
}

/// Non-fatal problem collected during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub step_name: String,
    pub error: String,
    pub severity: Severity,
}

/// Complete outcome of one [`Sequencer::run`](super::Sequencer::run).
///
/// Holds exactly one [`StepResult`] per declared step, in declaration order.
/// `ready` means "the placeholder UI may be replaced", not "every step
/// succeeded".
#[derive(Debug, Clone, Serialize)]
pub struct InitializationReport {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    steps: Vec<StepResult>,
    ready: bool,
    diagnostics: Vec<Diagnostic>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_duration_ms")]
    elapsed: Option<Duration>,
}

impl InitializationReport {
    pub(crate) fn begin(capacity: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            steps: Vec::with_capacity(capacity),
            ready: false,
            diagnostics: Vec::new(),
            elapsed: None,
        }
    }

    pub(crate) fn record(&mut self, result: StepResult, severity: Severity) {
        if let Some(error) = &result.error {
            self.diagnostics.push(Diagnostic {
                step_name: result.name.clone(),
                error: error.clone(),
                severity,
            });
        }
        self.steps.push(result);
    }

    pub(crate) fn complete(&mut self, elapsed: Duration) {
        self.elapsed = Some(elapsed);
        self.ready = true;
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Wall-clock time of the whole run, set once the run completes
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Look up the result of a step by name
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn has_failures(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| !s.succeeded)
    }

    /// Highest severity among the collected diagnostics
    pub fn worst_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_collects_diagnostics_for_failures_only() {
        let mut report = InitializationReport::begin(2);
        report.record(
            StepResult::success("load-fonts", Duration::from_millis(5)),
            Severity::Low,
        );
        report.record(
            StepResult::failure("init-storage", "disk full", Duration::from_millis(1)),
            Severity::High,
        );

        assert!(!report.is_ready());
        assert_eq!(report.steps().len(), 2);
        assert_eq!(report.diagnostics().len(), 1);
        assert_eq!(report.diagnostics()[0].step_name, "init-storage");
        assert_eq!(report.diagnostics()[0].severity, Severity::High);
        assert_eq!(report.worst_severity(), Some(Severity::High));

        report.complete(Duration::from_millis(6));
        assert!(report.is_ready());
        assert_eq!(report.elapsed(), Some(Duration::from_millis(6)));
    }

    #[test]
    fn test_report_serializes_durations_as_millis() {
        let mut report = InitializationReport::begin(1);
        report.record(
            StepResult::failure("replay-error-logs", "bad line", Duration::from_millis(12)),
            Severity::Medium,
        );
        report.complete(Duration::from_millis(15));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ready"], true);
        assert_eq!(json["elapsed_ms"], 15);
        assert_eq!(json["steps"][0]["duration_ms"], 12);
        assert_eq!(json["steps"][0]["error"], "bad line");
        assert_eq!(json["diagnostics"][0]["severity"], "medium");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::default(), Severity::Medium);
    }
}
