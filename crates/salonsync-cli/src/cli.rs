use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "salonsync")]
#[command(about = "Offline-first appointment book for the salon, synced when online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the JSON config file
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Book a new appointment
    #[command(alias = "new")]
    Add(AddArgs),
    /// Change fields of an existing appointment
    Edit(EditArgs),
    /// List appointments of the configured salon
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show changes waiting to be synced
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push queued changes and refresh the local copy
    Sync {
        /// Clear the whole cache before refreshing
        #[arg(long)]
        force: bool,
        /// Output the pass report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show connectivity and queue status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Settle a sync conflict for one appointment
    Resolve {
        /// Appointment ID
        id: String,
        /// Which version to keep
        #[arg(long, value_enum)]
        keep: KeepSide,
    },
    /// Run background sync until interrupted, printing conflicts as they appear
    Watch,
    /// Inspect or reset the local cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Show or create the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct AddArgs {
    /// Client name
    pub client: String,
    /// Service booked, e.g. "Haircut"
    #[arg(short, long, default_value = "")]
    pub service: String,
    /// Start time (RFC 3339 or "YYYY-MM-DD HH:MM" local time)
    #[arg(long, value_name = "TIME")]
    pub at: String,
    /// Duration in minutes
    #[arg(long, default_value_t = 60)]
    pub minutes: u32,
    /// Price, e.g. 25 or 25.50
    #[arg(long, default_value = "0")]
    pub price: String,
    #[arg(long, value_enum)]
    pub payment: Option<Payment>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct EditArgs {
    /// Appointment ID
    pub id: String,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(short, long)]
    pub service: Option<String>,
    /// New start time; the duration is kept unless --minutes is given
    #[arg(long, value_name = "TIME")]
    pub at: Option<String>,
    #[arg(long)]
    pub minutes: Option<u32>,
    #[arg(long)]
    pub price: Option<String>,
    #[arg(long, value_enum)]
    pub status: Option<Status>,
    #[arg(long, value_enum)]
    pub payment: Option<Payment>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Drop every cached entry
    Clear,
    /// Evict expired entries now
    Cleanup,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a config file
    Init {
        /// Salon backend base URL
        #[arg(long)]
        api_base_url: String,
        /// Salon whose appointments are mirrored
        #[arg(long)]
        salon_id: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum KeepSide {
    Local,
    Remote,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Status {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Payment {
    Cash,
    Card,
    Transfer,
    Other,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
