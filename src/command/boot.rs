use std::sync::Arc;

use anyhow::{Context, Result};
use safeguard::bootstrap::{boot, BootContext, BootOutcome, Presentation};
use safeguard::config::Config;
use safeguard::permissions::{Capability, PolicyPermissionProvider};

pub async fn run_boot(
    data_dir: Option<String>,
    fonts_dir: Option<String>,
    deny: Vec<Capability>,
    json: bool,
) -> Result<()> {
    let config = Config::resolve(data_dir, fonts_dir)?;
    let provider = Arc::new(PolicyPermissionProvider::denying(deny));
    let ctx = BootContext::new(config, provider);

    let outcome = boot(&ctx)
        .await
        .context("Startup pipeline rejected its step list")?;

    if json {
        let value = serde_json::json!({
            "outcome": outcome,
            "presentation": outcome.presentation(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &BootOutcome) {
    let report = &outcome.report;

    println!("🚀 Startup run {}", report.run_id());
    for step in report.steps() {
        let took = step
            .duration
            .map(|d| format!("{}ms", d.as_millis()))
            .unwrap_or_default();
        match &step.error {
            None => println!("   ✅ {:<22} {}", step.name, took),
            Some(error) => println!("   ❌ {:<22} {}  {}", step.name, took, error),
        }
    }

    if let Some(elapsed) = report.elapsed() {
        println!("   Total: {}ms", elapsed.as_millis());
    }

    if let Some(worst) = report.worst_severity() {
        println!(
            "⚠️  {} step(s) failed, worst severity: {}",
            report.diagnostics().len(),
            worst
        );
    }

    if let Some(permissions) = &outcome.permissions {
        for (capability, error) in permissions.prompt_failures() {
            println!("❌ Permission prompt for {} failed: {}", capability, error);
        }
    }

    match outcome.first_launch {
        Some(true) => println!("👋 First launch"),
        Some(false) => {}
        None => println!("⚠️  First-launch state unknown"),
    }

    match outcome.presentation() {
        Presentation::Splash => println!("⏳ Not ready, keeping splash screen"),
        Presentation::Main {
            permissions_advisory,
        } => {
            println!("✅ Ready, showing main screen");
            if let Some(advisory) = permissions_advisory {
                println!("\n{}", advisory);
            }
        }
    }
}
