use anyhow::Result;
use safeguard::config::Config;
use safeguard::journal::MetricsJournal;
use safeguard::storage::{KeyValueStore, FIRST_LAUNCH_KEY};

pub async fn run_status(data_dir: Option<String>) -> Result<()> {
    let config = Config::resolve(data_dir, None)?;
    println!("📁 Data directory: {:?}", config.data_dir);

    let store = KeyValueStore::new(&config.data_dir);
    match store.initialize().await {
        Ok(()) => {
            // Read without clearing; only a real launch consumes the flag
            if store.get(FIRST_LAUNCH_KEY, true).await? {
                println!("👋 Not launched yet");
            } else {
                println!("✅ Launched before");
            }
        }
        Err(e) => println!("❌ Store unreadable: {:#}", e),
    }

    let metrics = MetricsJournal::in_dir(&config.data_dir);
    metrics.load().await?;
    match metrics.last().await {
        Some(last) => {
            println!(
                "   Last startup: {} took {}ms ({} failed steps)",
                last.timestamp.format("%Y-%m-%d %H:%M:%S"),
                last.total_ms,
                last.failed_steps
            );
        }
        None => println!("   No startup recorded yet."),
    }

    Ok(())
}
