use anyhow::Result;
use safeguard::config::Config;
use safeguard::journal::ErrorJournal;

pub async fn run_logs(data_dir: Option<String>, limit: usize) -> Result<()> {
    let config = Config::resolve(data_dir, None)?;
    let journal = ErrorJournal::in_dir(&config.data_dir);
    let total = journal.load().await?;

    if total == 0 {
        println!("No errors logged.");
        return Ok(());
    }

    let records = journal.records().await;
    let skip = records.len().saturating_sub(limit);
    println!("📋 Showing {} of {} logged errors", records.len() - skip, total);
    for record in &records[skip..] {
        println!(
            "   {} [{}] {}: {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.severity,
            record.context,
            record.message
        );
    }

    Ok(())
}
