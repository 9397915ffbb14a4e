use analytics::{overall_accuracy, MetricsEngine};
use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::{load_config, Config, DEFAULT_CONFIG_FILE};
use core_types::{ElasticityRecord, PromotionSummary};
use dashboard::{Bands, DashboardLoader, JsonFileSource, SalesSource};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod report;

/// The main entry point for the PriceLens application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load PRICELENS_* and RUST_LOG overrides from a .env file, if there is one.
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Derive(args) => handle_derive(args, &config, cli.json),
        Commands::Estimate(args) => handle_estimate(args, &config, cli.json).await,
        Commands::Serve(args) => handle_serve(args, config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Price elasticity analytics: dashboard metrics and pricing recommendations.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file. Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive dashboard metrics and recommendations from elasticity records.
    Derive(DeriveArgs),
    /// Estimate elasticities, forecast sales and derive the full dashboard from raw sales.
    Estimate(EstimateArgs),
    /// Serve the dashboard API over HTTP.
    Serve(ServeArgs),
}

#[derive(Parser)]
struct DeriveArgs {
    /// JSON array of elasticity records.
    #[arg(long)]
    records: PathBuf,

    /// JSON array of promotion summaries.
    #[arg(long)]
    promotions: Option<PathBuf>,
}

#[derive(Parser)]
struct EstimateArgs {
    /// JSON array of sales observations.
    #[arg(long)]
    sales: PathBuf,
}

#[derive(Parser)]
struct ServeArgs {
    /// JSON array of sales observations, re-read on every refresh.
    #[arg(long)]
    sales: PathBuf,

    /// Overrides `server.addr` from the configuration.
    #[arg(long)]
    addr: Option<SocketAddr>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn handle_derive(args: DeriveArgs, config: &Config, json: bool) -> anyhow::Result<()> {
    let records: Vec<ElasticityRecord> = read_json(&args.records)?;
    let promotions: Vec<PromotionSummary> = match &args.promotions {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    tracing::info!(records = records.len(), promotions = promotions.len(), "Deriving dashboard.");

    let engine = MetricsEngine::new(config.derivation.clone());
    let (metrics, recommendations) = engine.derive_dashboard(&records, &promotions)?;

    if json {
        let output = serde_json::json!({
            "metrics": metrics,
            "recommendations": recommendations,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let bands = Bands::new(config.presentation.clone());
    println!("{}", report::metrics_table(&metrics));
    println!("{}", report::recommendations_table(&recommendations, &bands));
    Ok(())
}

async fn handle_estimate(args: EstimateArgs, config: &Config, json: bool) -> anyhow::Result<()> {
    let source = Arc::new(JsonFileSource::new(&args.sales));
    let sales = source.fetch_sales().await?;
    tracing::info!(observations = sales.len(), "Estimating elasticities.");

    let loader = DashboardLoader::new(source, config);
    let analysis = loader.analyze(&sales)?;

    if json {
        let output = serde_json::json!({
            "estimates": analysis.estimates,
            "segmentation": analysis.segmentation,
            "monthly": analysis.monthly,
            "optimization": analysis.optimization,
            "forecasts": analysis.forecasts,
            "forecastAccuracy": overall_accuracy(&analysis.forecasts),
            "promotions": analysis.promotions,
            "metrics": analysis.metrics,
            "recommendations": analysis.recommendations,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let bands = Bands::new(config.presentation.clone());
    println!("{}", report::estimates_table(&analysis.estimates));
    println!("{}", report::segmentation_table(&analysis.segmentation));
    println!("{}", report::optimization_table(&analysis.optimization));
    if !analysis.monthly.is_empty() {
        println!("{}", report::monthly_table(&analysis.monthly));
    }
    if !analysis.forecasts.is_empty() {
        println!("{}", report::forecasts_table(&analysis.forecasts));
    }
    if !analysis.promotions.is_empty() {
        println!("{}", report::promotions_table(&analysis.promotions));
    }
    println!("{}", report::metrics_table(&analysis.metrics));
    println!("{}", report::recommendations_table(&analysis.recommendations, &bands));
    Ok(())
}

async fn handle_serve(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    let source = Arc::new(JsonFileSource::new(&args.sales));
    web_server::run_server(&config, source).await
}
