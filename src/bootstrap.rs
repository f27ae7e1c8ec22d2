//! Application bootstrap.
//!
//! Declares the startup pipeline as data and turns the resulting report into
//! a presentation decision:
//! 1. load-fonts - bundled fonts from the fonts directory
//! 2. request-permissions - every capability, concurrently
//! 3. init-storage - key-value store
//! 4. replay-error-logs - error journal from previous runs
//! 5. load-metrics - startup metrics from previous runs
//! 6. check-first-launch - first-launch flag in the store
//!
//! After the run, every diagnostic is written to the error journal and the
//! run's timing to the metrics journal. Those writes are best effort.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::fonts::{FontLoader, FontManifest};
use crate::journal::{ErrorJournal, MetricsJournal};
use crate::permissions::{request_permissions, Capability, PermissionProvider, PermissionSummary};
use crate::startup::{InitializationReport, Sequencer, SequencerMisuse, Severity, Step};
use crate::storage::KeyValueStore;

pub const STEP_LOAD_FONTS: &str = "load-fonts";
pub const STEP_REQUEST_PERMISSIONS: &str = "request-permissions";
pub const STEP_INIT_STORAGE: &str = "init-storage";
pub const STEP_REPLAY_ERROR_LOGS: &str = "replay-error-logs";
pub const STEP_LOAD_METRICS: &str = "load-metrics";
pub const STEP_CHECK_FIRST_LAUNCH: &str = "check-first-launch";

/// Context string for diagnostics copied into the error journal
pub const INIT_ERROR_CONTEXT: &str = "App initialization";
/// Context string for permission prompts that failed outright
pub const PERMISSION_ERROR_CONTEXT: &str = "Permission request";

const FONT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Collaborators shared by the startup steps
pub struct BootContext {
    config: Config,
    provider: Arc<dyn PermissionProvider>,
    store: Arc<KeyValueStore>,
    errors: Arc<ErrorJournal>,
    metrics: Arc<MetricsJournal>,
    permissions: Arc<Mutex<Option<PermissionSummary>>>,
    first_launch: Arc<Mutex<Option<bool>>>,
}

impl BootContext {
    pub fn new(config: Config, provider: Arc<dyn PermissionProvider>) -> Self {
        let store = Arc::new(KeyValueStore::new(&config.data_dir));
        let errors = Arc::new(ErrorJournal::in_dir(&config.data_dir));
        let metrics = Arc::new(MetricsJournal::in_dir(&config.data_dir));

        Self {
            config,
            provider,
            store,
            errors,
            metrics,
            permissions: Arc::new(Mutex::new(None)),
            first_launch: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    pub fn errors(&self) -> &Arc<ErrorJournal> {
        &self.errors
    }

    pub fn metrics(&self) -> &Arc<MetricsJournal> {
        &self.metrics
    }

    /// The startup pipeline, in execution order.
    ///
    /// The permission step is left out when no capabilities are configured.
    pub fn steps(&self) -> Vec<Step> {
        let mut steps = Vec::with_capacity(6);

        let fonts_dir = self.config.fonts_dir.clone();
        let manifest = self.config.fonts.clone();
        steps.push(
            Step::new(STEP_LOAD_FONTS, move || load_fonts(fonts_dir, manifest))
                .with_severity(Severity::Low)
                .with_timeout(FONT_LOAD_TIMEOUT),
        );

        if !self.config.capabilities.is_empty() {
            let provider = Arc::clone(&self.provider);
            let capabilities = self.config.capabilities.clone();
            let slot = Arc::clone(&self.permissions);
            steps.push(
                Step::new(STEP_REQUEST_PERMISSIONS, move || {
                    acquire_permissions(provider, capabilities, slot)
                })
                .with_severity(Severity::Medium),
            );
        }

        let store = Arc::clone(&self.store);
        steps.push(
            Step::new(STEP_INIT_STORAGE, move || init_storage(store))
                .with_severity(Severity::High),
        );

        let errors = Arc::clone(&self.errors);
        steps.push(
            Step::new(STEP_REPLAY_ERROR_LOGS, move || replay_error_logs(errors))
                .with_severity(Severity::Medium),
        );

        let metrics = Arc::clone(&self.metrics);
        steps.push(
            Step::new(STEP_LOAD_METRICS, move || load_metrics(metrics))
                .with_severity(Severity::Low),
        );

        let store = Arc::clone(&self.store);
        let slot = Arc::clone(&self.first_launch);
        steps.push(
            Step::new(STEP_CHECK_FIRST_LAUNCH, move || check_first_launch(store, slot))
                .with_severity(Severity::Medium),
        );

        steps
    }

    async fn record_run(
        &self,
        report: &InitializationReport,
        permissions: Option<&PermissionSummary>,
    ) {
        for diagnostic in report.diagnostics() {
            if let Err(e) = self
                .errors
                .log_error(
                    format!("{}: {}", INIT_ERROR_CONTEXT, diagnostic.step_name),
                    &diagnostic.error,
                    diagnostic.severity,
                )
                .await
            {
                warn!("Failed to journal startup error: {:#}", e);
            }
        }

        // Denials are the user's answer; only failed prompts are errors
        let failures = permissions.map(|p| p.prompt_failures()).unwrap_or_default();
        for (capability, error) in failures {
            if let Err(e) = self
                .errors
                .log_error(
                    PERMISSION_ERROR_CONTEXT,
                    format!("{}: {}", capability, error),
                    Severity::Medium,
                )
                .await
            {
                warn!("Failed to journal permission error: {:#}", e);
            }
        }

        if let Err(e) = self.metrics.record(report).await {
            warn!("Failed to record startup metrics: {:#}", e);
        }
    }
}

async fn load_fonts(fonts_dir: PathBuf, manifest: FontManifest) -> Result<()> {
    let loaded = FontLoader::new(fonts_dir).load(&manifest).await?;
    info!("✅ {} fonts loaded", loaded.len());
    Ok(())
}

async fn acquire_permissions(
    provider: Arc<dyn PermissionProvider>,
    capabilities: Vec<Capability>,
    slot: Arc<Mutex<Option<PermissionSummary>>>,
) -> Result<()> {
    let summary = request_permissions(provider, &capabilities).await?;
    *slot.lock().await = Some(summary);
    Ok(())
}

async fn init_storage(store: Arc<KeyValueStore>) -> Result<()> {
    store.initialize().await
}

async fn replay_error_logs(errors: Arc<ErrorJournal>) -> Result<()> {
    let count = errors.load().await?;
    info!("📜 Replayed {} error log entries", count);
    Ok(())
}

async fn load_metrics(metrics: Arc<MetricsJournal>) -> Result<()> {
    let count = metrics.load().await?;
    info!("📈 Loaded {} startup metrics", count);
    Ok(())
}

async fn check_first_launch(
    store: Arc<KeyValueStore>,
    slot: Arc<Mutex<Option<bool>>>,
) -> Result<()> {
    let first = store.is_first_launch().await?;
    *slot.lock().await = Some(first);
    Ok(())
}

/// What the presentation layer should show after startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Presentation {
    /// Keep the placeholder up
    Splash,
    /// Show the real UI, with a dismissible notice when permissions are missing
    Main {
        permissions_advisory: Option<String>,
    },
}

/// Everything the caller needs from one launch
#[derive(Debug, Clone, Serialize)]
pub struct BootOutcome {
    pub report: InitializationReport,
    /// Absent when the permission step did not complete
    pub permissions: Option<PermissionSummary>,
    /// Absent when the store could not be read
    pub first_launch: Option<bool>,
}

impl BootOutcome {
    pub fn presentation(&self) -> Presentation {
        if !self.report.is_ready() {
            return Presentation::Splash;
        }

        Presentation::Main {
            permissions_advisory: self.permissions.as_ref().and_then(|p| p.advisory()),
        }
    }
}

/// Run the startup pipeline once and journal its diagnostics.
pub async fn boot(ctx: &BootContext) -> Result<BootOutcome, SequencerMisuse> {
    let mut sequencer = Sequencer::new();
    let report = sequencer.run(ctx.steps()).await?;

    let permissions = ctx.permissions.lock().await.take();
    ctx.record_run(&report, permissions.as_ref()).await;

    Ok(BootOutcome {
        report,
        permissions,
        first_launch: ctx.first_launch.lock().await.take(),
    })
}
