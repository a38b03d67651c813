use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use msiconf_core::{db, logging, notify::SlackNotifier, settings::Settings};
use serde_json::Value;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "msiconf administrative tooling", long_about = None)]
struct Cli {
    /// Settings file (TOML); falls back to MSICONF_CONFIG, then built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect the database pool and run a trivial query
    DbCheck,
    /// Send the metadata-change Slack notification for two metadata snapshots
    NotifyDiff(NotifyDiffArgs),
    /// Send the metadata-update-failed Slack notification
    NotifyFailure(NotifyFailureArgs),
}

#[derive(Args, Debug)]
struct NotifyDiffArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    dataset_id: String,
    /// Metadata JSON before the edit
    old: PathBuf,
    /// Metadata JSON after the edit
    new: PathBuf,
}

#[derive(Args, Debug)]
struct NotifyFailureArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    dataset_id: String,
    #[arg(long)]
    error: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    logging::init_logging(&settings.log)?;

    match cli.command {
        Command::DbCheck => handle_db_check(&settings).await,
        Command::NotifyDiff(args) => handle_notify_diff(&settings, args).await,
        Command::NotifyFailure(args) => handle_notify_failure(&settings, args).await,
    }
}

async fn handle_db_check(settings: &Settings) -> Result<()> {
    let pool = db::connect(&settings.db)
        .await
        .with_context(|| format!("failed to connect to {}:{}", settings.db.host, settings.db.port))?;
    db::ping(&pool).await.context("database ping failed")?;
    info!(
        host = %settings.db.host,
        database = %settings.db.database,
        "database reachable"
    );
    pool.close().await;
    Ok(())
}

async fn handle_notify_diff(settings: &Settings, args: NotifyDiffArgs) -> Result<()> {
    let notifier = enabled_notifier(settings)?;
    let old = read_json(&args.old)?;
    let new = read_json(&args.new)?;

    let text = msiconf_core::notify::metadata_change_message(&args.user, &args.dataset_id, &old, &new);
    notifier.send(&text).await.context("slack notification failed")?;
    info!(dataset_id = %args.dataset_id, "metadata change notification sent");
    Ok(())
}

async fn handle_notify_failure(settings: &Settings, args: NotifyFailureArgs) -> Result<()> {
    let notifier = enabled_notifier(settings)?;

    let text = msiconf_core::notify::update_failed_message(&args.user, &args.dataset_id, &args.error);
    notifier.send(&text).await.context("slack notification failed")?;
    info!(dataset_id = %args.dataset_id, "update failure notification sent");
    Ok(())
}

fn enabled_notifier(settings: &Settings) -> Result<SlackNotifier> {
    let notifier = SlackNotifier::from_settings(&settings.slack)?;
    if !notifier.is_enabled() {
        bail!("slack.webhook_url (or MSICONF_SLACK_WEBHOOK_URL) must be set");
    }
    Ok(notifier)
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}
