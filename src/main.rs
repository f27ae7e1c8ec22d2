use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod command;

use cli::{Cli, Commands};
use command::{run_boot, run_logs, run_status};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Boot { deny, json }) => {
            run_boot(cli.data_dir, cli.fonts_dir, deny, json).await?;
        }
        Some(Commands::Logs { limit }) => {
            run_logs(cli.data_dir, limit).await?;
        }
        Some(Commands::Status) => {
            run_status(cli.data_dir).await?;
        }
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Use 'safeguard boot' to run the startup pipeline.");
        }
    }

    Ok(())
}
