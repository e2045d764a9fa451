//! Command-line interface for screen-thyme
//!
//! # Usage Examples
//!
//! ```bash
//! # One sync cycle for every configured dataset
//! screen-thyme sync --postgres-url postgres://me@localhost/screentime \
//!   --apple-path ~/Library/Application\ Support/Knowledge/knowledgeC.db
//!
//! # Skip already-exported keys and commit rows together with their watermark
//! screen-thyme sync --dedupe --transactional
//!
//! # See what would be written
//! screen-thyme sync --dry-run
//!
//! # Datasets from a config file, then their watermarks
//! screen-thyme status --config screen-thyme.toml
//! ```
//!
//! Settings can also come from `PG_URL`, `APPLE_PATH` and `AW_PATH`, in the
//! environment or in a `.env` file. Scheduling is left to launchd, cron or a
//! systemd timer; each invocation runs every dataset once and exits non-zero
//! if any of them failed.

use anyhow::Context;
use clap::{Parser, Subcommand};
use screen_thyme::{ConnectionOpts, PostgresConnector, Settings, SyncCoordinator, WriteOpts};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "screen-thyme")]
#[command(about = "Incrementally export Screen Time and ActivityWatch data to PostgreSQL")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync cycle for every configured dataset
    Sync {
        #[command(flatten)]
        conn: ConnectionOpts,

        #[command(flatten)]
        write: WriteOpts,
    },

    /// Print the current watermark of every configured dataset
    Status {
        #[command(flatten)]
        conn: ConnectionOpts,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    match run().await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether every dataset succeeded.
async fn run() -> anyhow::Result<bool> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { conn, write } => {
            let settings = Settings::resolve(&conn, &write).context("Invalid configuration")?;
            let coordinator = coordinator(settings)?;

            let reports = coordinator.run_all_datasets().await;
            for report in &reports {
                println!("{report}");
            }
            Ok(reports.iter().all(|r| r.is_success()))
        }
        Commands::Status { conn } => {
            let settings = Settings::resolve(&conn, &WriteOpts::default())
                .context("Invalid configuration")?;
            let coordinator = coordinator(settings)?;

            let reports = coordinator.status().await;
            for report in &reports {
                println!("{report}");
            }
            Ok(reports.iter().all(|r| r.result.is_ok()))
        }
    }
}

fn coordinator(settings: Settings) -> anyhow::Result<SyncCoordinator<PostgresConnector>> {
    let connector = PostgresConnector::new(settings.postgres_url, settings.postgres);
    SyncCoordinator::new(connector, settings.datasets, settings.exporter)
        .context("Invalid dataset configuration")
}
