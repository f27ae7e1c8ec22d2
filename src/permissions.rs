//! Device permission acquisition.
//!
//! Permission prompts have no ordering dependency among themselves, so every
//! capability is requested at once through
//! [`Sequencer::run_concurrent_group`] and the outcomes are reported per
//! capability instead of being collapsed into a single "all granted" flag.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::startup::{Sequencer, SequencerMisuse, Step, StepResult};

/// Device capability the application asks the user for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    LocationForeground,
    LocationBackground,
    Camera,
    Microphone,
    Contacts,
    Messaging,
    Telephony,
}

impl Capability {
    /// Every capability, in the order the application requests them
    pub const ALL: [Capability; 7] = [
        Capability::LocationForeground,
        Capability::LocationBackground,
        Capability::Camera,
        Capability::Microphone,
        Capability::Contacts,
        Capability::Messaging,
        Capability::Telephony,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::LocationForeground => "location-foreground",
            Capability::LocationBackground => "location-background",
            Capability::Camera => "camera",
            Capability::Microphone => "microphone",
            Capability::Contacts => "contacts",
            Capability::Messaging => "messaging",
            Capability::Telephony => "telephony",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability '{0}' (expected one of: location-foreground, location-background, camera, microphone, contacts, messaging, telephony)")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// Answer from the platform's permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// A capability request resolved to anything but granted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("permission {status}: {capability}")]
pub struct PermissionDenied {
    pub capability: Capability,
    pub status: PermissionStatus,
}

/// Source of permission answers (the platform, or a fixed policy).
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Ask for a single capability.
    ///
    /// An `Err` means the prompt itself failed, which is different from the
    /// user saying no.
    async fn request(&self, capability: Capability) -> anyhow::Result<PermissionStatus>;
}

/// Provider that answers from a fixed set of denied capabilities.
///
/// Used by the CLI host, where there is no platform dialog to show.
#[derive(Debug, Clone, Default)]
pub struct PolicyPermissionProvider {
    denied: HashSet<Capability>,
}

impl PolicyPermissionProvider {
    /// Grant everything
    pub fn grant_all() -> Self {
        Self::default()
    }

    pub fn denying(denied: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PermissionProvider for PolicyPermissionProvider {
    async fn request(&self, capability: Capability) -> anyhow::Result<PermissionStatus> {
        if self.denied.contains(&capability) {
            Ok(PermissionStatus::Denied)
        } else {
            Ok(PermissionStatus::Granted)
        }
    }
}

/// Per-capability result of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionOutcome {
    pub capability: Capability,
    pub granted: bool,
    /// Answer from the prompt; `None` when the prompt itself failed
    pub status: Option<PermissionStatus>,
}

/// Outcome of [`request_permissions`], in the order capabilities were declared
#[derive(Debug, Clone, Serialize)]
pub struct PermissionSummary {
    outcomes: Vec<PermissionOutcome>,
    results: Vec<StepResult>,
}

impl PermissionSummary {
    pub fn outcomes(&self) -> &[PermissionOutcome] {
        &self.outcomes
    }

    /// Underlying step results, carrying the denial or prompt error
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn all_granted(&self) -> bool {
        self.outcomes.iter().all(|o| o.granted)
    }

    pub fn is_granted(&self, capability: Capability) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.capability == capability && o.granted)
    }

    pub fn denied(&self) -> Vec<Capability> {
        self.outcomes
            .iter()
            .filter(|o| !o.granted)
            .map(|o| o.capability)
            .collect()
    }

    /// Capabilities whose prompt failed, with the error it failed with.
    ///
    /// A user saying no is not a failure and is not listed here.
    pub fn prompt_failures(&self) -> Vec<(Capability, &str)> {
        self.outcomes
            .iter()
            .zip(&self.results)
            .filter(|(o, _)| o.status.is_none())
            .map(|(o, r)| (o.capability, r.error.as_deref().unwrap_or("unknown error")))
            .collect()
    }

    /// Dismissible notice to show when any capability was not granted
    pub fn advisory(&self) -> Option<String> {
        let denied = self.denied();
        if denied.is_empty() {
            return None;
        }

        let names: Vec<&str> = denied.iter().map(|c| c.as_str()).collect();
        Some(format!(
            "Permissions Required: this app needs certain permissions to function properly \
            ({}). Please grant them in Settings.",
            names.join(", ")
        ))
    }
}

type AnswerBook = Arc<Mutex<HashMap<Capability, PermissionStatus>>>;

async fn request_one(
    provider: Arc<dyn PermissionProvider>,
    capability: Capability,
    answers: AnswerBook,
) -> anyhow::Result<()> {
    let status = provider.request(capability).await?;
    debug!("   {}: {}", capability, status);
    if let Ok(mut answers) = answers.lock() {
        answers.insert(capability, status);
    }
    match status {
        PermissionStatus::Granted => Ok(()),
        status => Err(PermissionDenied { capability, status }.into()),
    }
}

/// Request every capability concurrently and collect per-capability outcomes.
///
/// A denial is recorded as a failed step carrying [`PermissionDenied`]; it is
/// never returned as an error. Duplicated capabilities are a wiring mistake
/// and fail with [`SequencerMisuse`] before any prompt is shown.
pub async fn request_permissions(
    provider: Arc<dyn PermissionProvider>,
    capabilities: &[Capability],
) -> Result<PermissionSummary, SequencerMisuse> {
    info!("🔐 Requesting {} permissions...", capabilities.len());

    let answers: AnswerBook = Arc::default();
    let steps = capabilities
        .iter()
        .map(|&capability| {
            let provider = Arc::clone(&provider);
            let answers = Arc::clone(&answers);
            Step::new(capability.as_str(), move || {
                request_one(provider, capability, answers)
            })
        })
        .collect();

    let results = Sequencer::new().run_concurrent_group(steps).await?;
    let answers = answers.lock().map(|a| a.clone()).unwrap_or_default();

    let outcomes: Vec<PermissionOutcome> = capabilities
        .iter()
        .zip(&results)
        .map(|(&capability, result)| PermissionOutcome {
            capability,
            granted: result.succeeded,
            status: answers.get(&capability).copied(),
        })
        .collect();

    let summary = PermissionSummary { outcomes, results };
    if summary.all_granted() {
        info!("✅ All permissions granted");
    } else {
        let denied: Vec<&str> = summary.denied().iter().map(|c| c.as_str()).collect();
        warn!("⚠️  Permissions not granted: {}", denied.join(", "));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Provider with a scripted answer and delay per capability
    struct ScriptedProvider {
        answers: HashMap<Capability, (PermissionStatus, u64)>,
        settled: Mutex<Vec<Capability>>,
    }

    impl ScriptedProvider {
        fn new(answers: &[(Capability, PermissionStatus, u64)]) -> Self {
            Self {
                answers: answers.iter().map(|&(c, s, d)| (c, (s, d))).collect(),
                settled: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PermissionProvider for ScriptedProvider {
        async fn request(&self, capability: Capability) -> anyhow::Result<PermissionStatus> {
            let (status, delay_ms) = self
                .answers
                .get(&capability)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no dialog for {}", capability))?;
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            self.settled.lock().unwrap().push(capability);
            Ok(status)
        }
    }

    #[test]
    fn test_capability_parse() {
        assert_eq!("camera".parse::<Capability>().unwrap(), Capability::Camera);
        assert_eq!(
            "Location_Background".parse::<Capability>().unwrap(),
            Capability::LocationBackground
        );
        assert!("bluetooth".parse::<Capability>().is_err());

        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>().unwrap(), capability);
        }
    }

    #[tokio::test]
    async fn test_outcomes_keep_declaration_order() {
        let provider = Arc::new(ScriptedProvider::new(&[
            (Capability::LocationForeground, PermissionStatus::Granted, 10),
            (Capability::Camera, PermissionStatus::Denied, 60),
            (Capability::Contacts, PermissionStatus::Granted, 0),
        ]));

        let summary = request_permissions(
            provider.clone(),
            &[
                Capability::LocationForeground,
                Capability::Camera,
                Capability::Contacts,
            ],
        )
        .await
        .unwrap();

        let order: Vec<Capability> = summary.outcomes().iter().map(|o| o.capability).collect();
        assert_eq!(
            order,
            vec![
                Capability::LocationForeground,
                Capability::Camera,
                Capability::Contacts
            ]
        );
        assert!(summary.is_granted(Capability::LocationForeground));
        assert!(!summary.is_granted(Capability::Camera));
        assert!(summary.is_granted(Capability::Contacts));
        assert_eq!(summary.denied(), vec![Capability::Camera]);

        // camera answered last
        assert_eq!(
            provider.settled.lock().unwrap().last(),
            Some(&Capability::Camera)
        );
    }

    #[tokio::test]
    async fn test_denial_is_recorded_not_thrown() {
        let provider = Arc::new(PolicyPermissionProvider::denying([Capability::Microphone]));
        let summary = request_permissions(provider, &Capability::ALL).await.unwrap();

        assert!(!summary.all_granted());
        assert_eq!(summary.outcomes().len(), Capability::ALL.len());

        let mic = &summary.results()[3];
        assert_eq!(mic.name, "microphone");
        assert_eq!(mic.error.as_deref(), Some("permission denied: microphone"));

        assert_eq!(summary.outcomes()[3].status, Some(PermissionStatus::Denied));
        assert!(summary.prompt_failures().is_empty());

        let advisory = summary.advisory().unwrap();
        assert!(advisory.starts_with("Permissions Required"));
        assert!(advisory.contains("microphone"));
    }

    #[tokio::test]
    async fn test_prompt_error_counts_as_not_granted() {
        let provider = Arc::new(ScriptedProvider::new(&[(
            Capability::Camera,
            PermissionStatus::Granted,
            0,
        )]));

        let summary = request_permissions(provider, &[Capability::Camera, Capability::Telephony])
            .await
            .unwrap();

        assert!(summary.is_granted(Capability::Camera));
        assert!(!summary.is_granted(Capability::Telephony));
        assert!(summary.results()[1]
            .error
            .as_deref()
            .unwrap()
            .contains("no dialog"));

        assert_eq!(summary.outcomes()[1].status, None);
        let failures = summary.prompt_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, Capability::Telephony);
        assert!(failures[0].1.contains("no dialog"));
    }

    #[tokio::test]
    async fn test_all_granted_has_no_advisory() {
        let provider = Arc::new(PolicyPermissionProvider::grant_all());
        let summary = request_permissions(provider, &Capability::ALL).await.unwrap();

        assert!(summary.all_granted());
        assert!(summary.advisory().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_capability_is_misuse() {
        let provider = Arc::new(PolicyPermissionProvider::grant_all());
        let err = request_permissions(provider, &[Capability::Camera, Capability::Camera])
            .await
            .unwrap_err();
        assert_eq!(err, SequencerMisuse::DuplicateStepName("camera".to_string()));
    }

    #[tokio::test]
    async fn test_no_capabilities_is_misuse() {
        let provider = Arc::new(PolicyPermissionProvider::grant_all());
        let err = request_permissions(provider, &[]).await.unwrap_err();
        assert_eq!(err, SequencerMisuse::EmptySteps);
    }
}
