use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use msiconf::{router, AppState};
use msiconf_core::{
    generate_processing_config, logging,
    resolution::{lookup_tier, ResolutionParams, RESOLUTION_TABLE, TIER_THRESHOLDS},
    services::Services,
    settings::Settings,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "MSI processing config generator and API server", long_about = None)]
struct Cli {
    /// Settings file (TOML); falls back to MSICONF_CONFIG, then built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive a processing config from an experiment metadata JSON document
    Generate(GenerateArgs),
    /// Print the resolving-power tier table, or a single tier by name
    Tiers(TiersArgs),
    /// Start the HTTP API server
    Serve,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Metadata file, or "-" to read standard input
    input: PathBuf,
}

#[derive(Args, Debug)]
struct TiersArgs {
    /// Tier name such as "140K"; includes tiers that threshold selection never picks
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    logging::init_logging(&settings.log)?;

    match cli.command {
        Command::Generate(args) => handle_generate(&settings, &args),
        Command::Tiers(args) => print_tiers(args.name.as_deref()),
        Command::Serve => handle_serve(settings).await,
    }
}

fn handle_generate(settings: &Settings, args: &GenerateArgs) -> Result<()> {
    let raw = if args.input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read metadata from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))?
    };

    let metadata: Value = serde_json::from_str(&raw).context("metadata is not valid JSON")?;
    let config = match generate_processing_config(&metadata, &settings.default_adducts) {
        Ok(config) => config,
        Err(err) => bail!("invalid metadata: {err}"),
    };

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn print_tiers(name: Option<&str>) -> Result<()> {
    let rows: Vec<ResolutionParams> = match name {
        Some(name) => match lookup_tier(name) {
            Some(params) => vec![params],
            None => bail!("unknown resolution tier {name:?}"),
        },
        None => RESOLUTION_TABLE.to_vec(),
    };

    let mut table = Table::new();
    table.set_header(vec!["tier", "sigma", "fwhm", "pts_per_mz", "selected for RP200"]);

    for params in rows {
        table.add_row(vec![
            params.tier.to_string(),
            params.sigma.to_string(),
            params.fwhm.to_string(),
            params.pts_per_mz.to_string(),
            rp200_range(params.tier),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn rp200_range(tier: &str) -> String {
    let mut lower = 0.0;
    for (limit, params) in TIER_THRESHOLDS {
        if params.tier == tier {
            return format!("[{lower}, {limit})");
        }
        lower = limit;
    }
    if tier == "1000K" {
        format!("[{lower}, inf)")
    } else {
        "by name only".to_string()
    }
}

async fn handle_serve(settings: Settings) -> Result<()> {
    let bind = settings.server.bind.clone();

    let services = Services::init(settings)
        .await
        .context("failed to initialize services")?;
    let app = router(Arc::new(AppState::new(services)));

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
