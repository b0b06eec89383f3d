use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use dumpvault::cli::{
    handle_backup_command, handle_fetch_command, handle_prune_command, handle_restore_command,
    handle_status_command, handle_sync_command,
};
use dumpvault::config::{resolve_config_path, Settings};

#[derive(Parser)]
#[command(
    name = "dumpvault",
    author = "Kaylee Beyene",
    version,
    about = "Crash-safe MySQL/MariaDB backups with calendar retention",
    long_about = "dumpvault writes one zip archive per database and day, each carrying \
                  the accounts that hold grants on that database. Old archives are \
                  pruned on a daily/weekly/monthly/yearly calendar and the backup \
                  directory can be mirrored, optionally encrypted, to a remote target."
)]
struct Cli {
    /// Path to the JSON config file; falls back to $DUMPVAULT_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full backup cycle (dump, prune, sync)
    Backup,

    /// Show configuration and local backups
    Status {
        /// Evaluate retention as of this date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Delete backups outside the retention policy
    Prune {
        /// Evaluate retention as of this date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Actually delete; without it only the summary is shown
        #[arg(short, long)]
        force: bool,
    },

    /// Mirror the backup directory to the remote target
    Sync,

    /// Download backups from the remote target
    Fetch {
        /// File name, `*` and `?` wildcards allowed
        pattern: String,

        /// Destination directory (default: the backup directory)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },

    /// Restore the most recent backup day into the server
    Restore {
        /// Use the latest backup day strictly before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<NaiveDate>,

        /// Skip the confirmation step
        #[arg(short, long)]
        force: bool,
    },
}

/// Log to stderr, plus the configured log file if any
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    // Use INFO level by default.
    let directive = format!(
        "info,{}",
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default()
    );

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .and_then(file_layer)
                .with_filter(EnvFilter::new(directive)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref())?;
    let settings = Settings::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_tracing(settings.log_file.as_deref())?;
    tracing::debug!(config = %config_path.display(), "loaded settings");

    let today = Local::now().date_naive();

    match cli.command {
        Some(Commands::Backup) => handle_backup_command(&settings)?,
        Some(Commands::Status { today: at }) => {
            handle_status_command(&config_path, &settings, at.unwrap_or(today))?
        }
        Some(Commands::Prune { today: at, force }) => {
            handle_prune_command(&settings, at.unwrap_or(today), force)?
        }
        Some(Commands::Sync) => handle_sync_command(&settings)?,
        Some(Commands::Fetch { pattern, dest }) => {
            handle_fetch_command(&settings, &pattern, dest)?
        }
        Some(Commands::Restore { before, force }) => {
            handle_restore_command(&settings, before, force)?
        }
        None => {
            println!("dumpvault - crash-safe MySQL/MariaDB backups");
            println!();
            println!("Run 'dumpvault --help' for usage information.");
            println!("Run 'dumpvault status' to check your configuration.");
        }
    }

    Ok(())
}
