use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use uuid::Uuid;

use uptime_engine::Engine;
use uptime_engine::config::Config;
use uptime_engine::database::DatabaseImpl;

/// Uptime check and alerting engine
#[derive(Debug, Parser)]
#[command(name = "uptime-engine", version, about)]
struct Cli {
    /// Path to the TOML config file (created with defaults if missing)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one batch over every due monitor and print the summary
    Run,
    /// Run a batch on every tick until interrupted
    Watch {
        /// Seconds between batches (defaults to scheduler.watch_interval_secs)
        #[arg(long)]
        every: Option<u64>,
    },
    /// Check one monitor now, ignoring its interval
    Check { id: Uuid },
    /// Print rolling uptime for one monitor
    Stats { id: Uuid },
    /// Delete check history older than the retention window
    Prune,
    /// Create or upgrade the database schema
    Migrate,
    /// Send a test push notification to every registered device
    TestPush,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_config(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env();

    match cli.command {
        Command::Config => {
            println!("{}", config);
        }
        Command::Migrate => {
            DatabaseImpl::open(&config.database.path, config.database.pool_size).await?;
            info!(path = %config.database.path, "Database schema is up to date");
        }
        Command::Run => {
            let engine = Engine::open(&config).await?;
            let summary = engine.run_batch().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Watch { every } => {
            let engine = Engine::open(&config).await?;
            let every = every.unwrap_or(config.scheduler.watch_interval_secs).max(1);
            watch(&engine, Duration::from_secs(every)).await?;
        }
        Command::Check { id } => {
            let engine = Engine::open(&config).await?;
            let Some(outcome) = engine.check_now(id).await? else {
                bail!("Monitor {} not found", id);
            };
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Stats { id } => {
            let engine = Engine::open(&config).await?;
            let Some(stats) = engine.stats(id).await? else {
                bail!("Monitor {} not found", id);
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Prune => {
            let engine = Engine::open(&config).await?;
            let deleted = engine.prune().await?;
            println!("Deleted {} expired checks", deleted);
        }
        Command::TestPush => {
            let engine = Engine::open(&config).await?;
            match engine.send_test_push().await? {
                Some(outcome) => println!(
                    "Push sent: {} succeeded, {} failed, {} invalid tokens removed",
                    outcome.succeeded,
                    outcome.failed,
                    outcome.invalid_tokens.len()
                ),
                None => bail!("Push notifications are not configured"),
            }
        }
    }

    Ok(())
}

/// One batch per tick, then prune; stops on Ctrl-C
async fn watch(engine: &Engine, every: Duration) -> Result<()> {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(every_secs = every.as_secs(), "Watching monitors");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.run_batch().await {
                    Ok(summary) => info!(
                        checked = summary.checked,
                        alerts = summary.alerts_fired,
                        deferred = summary.deferred,
                        "Batch complete"
                    ),
                    Err(e) => error!(error = %e, "Batch failed"),
                }
                if let Err(e) = engine.prune().await {
                    warn!(error = %e, "Retention cleanup failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}
