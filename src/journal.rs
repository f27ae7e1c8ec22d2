//! Diagnostic journals: error log and startup metrics.
//!
//! Each journal is a JSON-lines file replayed into memory at startup and
//! rewritten on every append. Journals are bounded; the oldest records are
//! dropped first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::startup::{InitializationReport, Severity};

pub const ERROR_LOG_FILE: &str = "error_logs.jsonl";
pub const METRICS_FILE: &str = "startup_metrics.jsonl";

/// Most recent error records kept on disk
pub const MAX_ERROR_RECORDS: usize = 100;
/// Most recent startup metrics kept on disk
pub const MAX_METRIC_RECORDS: usize = 50;

struct JournalState<T> {
    records: Vec<T>,
    loaded: bool,
}

/// Bounded JSON-lines journal
pub struct Journal<T> {
    path: PathBuf,
    capacity: usize,
    state: RwLock<JournalState<T>>,
}

impl<T> Journal<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            state: RwLock::new(JournalState {
                records: Vec::new(),
                loaded: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the journal file into memory.
    ///
    /// Malformed lines are skipped with a warning. Returns the number of
    /// records replayed.
    pub async fn load(&self) -> Result<usize> {
        let mut state = self.state.write().await;
        self.load_locked(&mut state).await
    }

    async fn load_locked(&self, state: &mut JournalState<T>) -> Result<usize> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read journal: {:?}", self.path))
            }
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping malformed journal line {} in {:?}: {}",
                    index + 1,
                    self.path,
                    e
                ),
            }
        }

        let overflow = records.len().saturating_sub(self.capacity);
        records.drain(..overflow);

        debug!("Replayed {} records from {:?}", records.len(), self.path);
        state.records = records;
        state.loaded = true;
        Ok(state.records.len())
    }

    /// Append a record and persist the journal.
    ///
    /// Replays the file first if [`load`](Self::load) has not run yet, so
    /// existing records are never overwritten.
    pub async fn append(&self, record: T) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.loaded {
            self.load_locked(&mut state).await?;
        }

        state.records.push(record);
        let overflow = state.records.len().saturating_sub(self.capacity);
        state.records.drain(..overflow);

        let mut content = String::new();
        for record in &state.records {
            content.push_str(&serde_json::to_string(record).context("Failed to serialize record")?);
            content.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write journal: {:?}", self.path))?;

        Ok(())
    }

    /// Snapshot of the records currently in memory
    pub async fn records(&self) -> Vec<T> {
        self.state.read().await.records.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }
}

/// One logged error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub context: String,
    pub message: String,
    pub severity: Severity,
}

pub type ErrorJournal = Journal<ErrorRecord>;

impl Journal<ErrorRecord> {
    pub fn in_dir(data_dir: &Path) -> Self {
        Journal::new(data_dir.join(ERROR_LOG_FILE), MAX_ERROR_RECORDS)
    }

    pub async fn log_error(
        &self,
        context: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Result<()> {
        let record = ErrorRecord {
            timestamp: Utc::now(),
            context: context.into(),
            message: message.into(),
            severity,
        };
        debug!(
            "Logging error [{}] {}: {}",
            record.severity, record.context, record.message
        );
        self.append(record).await
    }
}

/// Timing summary of one startup run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupMetric {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub total_ms: u64,
    pub failed_steps: usize,
}

pub type MetricsJournal = Journal<StartupMetric>;

impl Journal<StartupMetric> {
    pub fn in_dir(data_dir: &Path) -> Self {
        Journal::new(data_dir.join(METRICS_FILE), MAX_METRIC_RECORDS)
    }

    /// Append the timing of a completed run
    pub async fn record(&self, report: &InitializationReport) -> Result<()> {
        let metric = StartupMetric {
            run_id: report.run_id(),
            timestamp: report.started_at(),
            total_ms: report.elapsed().map(|d| d.as_millis() as u64).unwrap_or(0),
            failed_steps: report.diagnostics().len(),
        };
        info!(
            "📈 Startup took {}ms ({} failed steps)",
            metric.total_ms, metric.failed_steps
        );
        self.append(metric).await
    }

    pub async fn last(&self) -> Option<StartupMetric> {
        self.state.read().await.records.last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::startup::{Sequencer, Step};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let tmp = tempdir().unwrap();
        let journal = ErrorJournal::in_dir(tmp.path());
        assert_eq!(journal.load().await.unwrap(), 0);
        assert!(journal.is_empty().await);
    }

    #[tokio::test]
    async fn test_log_error_and_replay() {
        let tmp = tempdir().unwrap();
        let journal = ErrorJournal::in_dir(tmp.path());
        journal
            .log_error("App initialization: init-storage", "disk full", Severity::High)
            .await
            .unwrap();
        journal
            .log_error("Permission request", "camera denied", Severity::Medium)
            .await
            .unwrap();

        let replayed = ErrorJournal::in_dir(tmp.path());
        assert_eq!(replayed.load().await.unwrap(), 2);

        let records = replayed.records().await;
        assert_eq!(records[0].message, "disk full");
        assert_eq!(records[0].severity, Severity::High);
        assert_eq!(records[1].context, "Permission request");
    }

    #[tokio::test]
    async fn test_append_before_load_keeps_existing_records() {
        let tmp = tempdir().unwrap();
        let first = ErrorJournal::in_dir(tmp.path());
        first.log_error("a", "one", Severity::Low).await.unwrap();

        let second = ErrorJournal::in_dir(tmp.path());
        second.log_error("b", "two", Severity::Low).await.unwrap();
        assert_eq!(second.len().await, 2);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let tmp = tempdir().unwrap();
        let journal = ErrorJournal::in_dir(tmp.path());
        journal.log_error("ctx", "kept", Severity::Low).await.unwrap();

        let mut content = std::fs::read_to_string(journal.path()).unwrap();
        content.push_str("{not json\n\n");
        std::fs::write(journal.path(), content).unwrap();

        let replayed = ErrorJournal::in_dir(tmp.path());
        assert_eq!(replayed.load().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest() {
        let tmp = tempdir().unwrap();
        let journal: Journal<ErrorRecord> = Journal::new(tmp.path().join("small.jsonl"), 3);
        for i in 0..5 {
            journal
                .log_error("ctx", format!("error {}", i), Severity::Low)
                .await
                .unwrap();
        }

        let messages: Vec<String> = journal
            .records()
            .await
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(messages, vec!["error 2", "error 3", "error 4"]);

        let content = std::fs::read_to_string(journal.path()).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_metrics_record_from_report() {
        let tmp = tempdir().unwrap();
        let report = Sequencer::new()
            .run(vec![
                Step::new("ok", || async { Ok(()) }),
                Step::new("fails", || async { Err(anyhow::anyhow!("nope")) }),
            ])
            .await
            .unwrap();

        let metrics = MetricsJournal::in_dir(tmp.path());
        metrics.record(&report).await.unwrap();

        let replayed = MetricsJournal::in_dir(tmp.path());
        replayed.load().await.unwrap();
        let last = replayed.last().await.unwrap();
        assert_eq!(last.run_id, report.run_id());
        assert_eq!(last.failed_steps, 1);
    }
}
