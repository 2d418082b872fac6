use analytics::{AnalyticsEngine, AnalyticsError, MetricsReport};
use api_client::CoinGeckoClient;
use api_client::error::ApiError;
use chrono::Utc;
use clap::{Parser, Subcommand};
use configuration::cli::RunOverrides;
use configuration::{Config, ConfigError, load_config, logging::init_tracing};
use core_types::Asset;
use market_data::{ExportError, FetchError, Fetcher, export_dataset, load_dataset};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

mod display;

/// The fixed pair every command works on.
const PAIR: (Asset, Asset) = (Asset::Bitcoin, Asset::Ethereum);

/// The main entry point for the cryptopair application.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let (kind, code) = classify(&e);
            tracing::error!(kind, error = %format!("{e:#}"), "Run failed");
            eprintln!("error[{kind}]: {e:#}");
            ExitCode::from(code)
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Fetches BTC and ETH market history and compares their trend, risk and correlation.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./config.toml when present.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch both assets, align them and compute the metrics.
    Run(RunOverrides),

    /// Recompute the metrics from a previously exported dataset.
    Analyze {
        /// A JSON file written by `run --export`.
        #[arg(long)]
        input: PathBuf,
    },

    /// Print the current market data for both assets.
    Snapshot,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Commands::Run(overrides) = &cli.command {
        overrides.apply(&mut config);
        config.validate()?;
    }

    // Held until exit so buffered file output is flushed.
    let _guard = init_tracing(&config.logging)?;

    match cli.command {
        Commands::Run(_) => handle_run(&config).await,
        Commands::Analyze { input } => handle_analyze(&config, &input),
        Commands::Snapshot => handle_snapshot(&config).await,
    }
}

/// Handles the orchestration of a fetch-then-analyze run.
async fn handle_run(config: &Config) -> anyhow::Result<()> {
    let range = config.fetch.date_range(Utc::now().date_naive())?;
    tracing::info!(start = %range.start, end = %range.end, granularity = %config.fetch.granularity, "Starting run");

    let client = CoinGeckoClient::new(&config.api)?;
    let fetcher = Fetcher::new(client, &config.fetch, config.retry.clone());

    let alignment = fetcher.fetch_aligned(PAIR.0, PAIR.1, range).await?;
    display::print_alignment(&alignment.summary);

    let report = AnalyticsEngine::new().calculate(&alignment.dataset, &config.analysis)?;
    display::print_report(&report);

    if config.export.enabled {
        let document = ExportedMetrics {
            alignment: &alignment.summary,
            report: &report,
        };
        let path = export_dataset(
            &config.export.output_dir,
            &alignment.dataset,
            &document,
            Utc::now(),
        )?;
        println!("Exported to {}", path.display());
    }

    Ok(())
}

#[derive(Serialize)]
struct ExportedMetrics<'a> {
    alignment: &'a market_data::AlignmentSummary,
    report: &'a MetricsReport,
}

fn handle_analyze(config: &Config, input: &std::path::Path) -> anyhow::Result<()> {
    let dataset = load_dataset(input)?;
    tracing::info!(path = %input.display(), rows = dataset.len(), "Loaded dataset");

    let report = AnalyticsEngine::new().calculate(&dataset, &config.analysis)?;
    display::print_report(&report);
    Ok(())
}

async fn handle_snapshot(config: &Config) -> anyhow::Result<()> {
    let client = CoinGeckoClient::new(&config.api)?;
    let fetcher = Fetcher::new(client, &config.fetch, config.retry.clone());

    let (first, second) = futures::future::try_join(
        fetcher.fetch_snapshot(PAIR.0),
        fetcher.fetch_snapshot(PAIR.1),
    )
    .await?;
    display::print_snapshots(&[first, second], &config.api.vs_currency);
    Ok(())
}

// ==============================================================================
// Exit Codes
// ==============================================================================

/// Maps an error to the kind printed on stderr and the process exit code.
fn classify(err: &anyhow::Error) -> (&'static str, u8) {
    if let Some(e) = err.downcast_ref::<FetchError>() {
        let code = match e {
            FetchError::InvalidRequest(_) => 2,
            FetchError::RateLimited { .. } => 3,
            FetchError::FetchFailed { .. } => 4,
            FetchError::AlignmentEmpty { .. } => 5,
        };
        return (e.kind(), code);
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return ("InvalidRequest", 2);
    }
    match err.downcast_ref::<AnalyticsError>() {
        Some(AnalyticsError::InvalidParameter(_)) => return ("InvalidRequest", 2),
        Some(_) => return ("AnalyticsFailed", 1),
        None => {}
    }
    if let Some(ApiError::Configuration(_)) = err.downcast_ref::<ApiError>() {
        return ("InvalidRequest", 2);
    }
    if err.downcast_ref::<ExportError>().is_some() {
        return ("ExportFailed", 1);
    }
    ("Internal", 1)
}
