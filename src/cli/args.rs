use clap::{Parser, Subcommand};
use safeguard::permissions::Capability;

/// Safeguard - run and inspect the app startup pipeline
#[derive(Parser)]
#[command(name = "safeguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for the store and journals. Defaults to ~/.safeguard
    #[arg(long, global = true, env = "SAFEGUARD_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Directory holding bundled fonts. Defaults to <data-dir>/fonts
    #[arg(long, global = true, env = "SAFEGUARD_FONTS_DIR")]
    pub fonts_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the startup pipeline and print the report
    Boot {
        /// Answer "denied" for this capability (repeatable)
        #[arg(long = "deny", value_name = "CAPABILITY")]
        deny: Vec<Capability>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the replayed error log
    Logs {
        /// Only show the most recent N entries
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Show first-launch state and the last startup timing
    Status,
}
