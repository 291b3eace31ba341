//! SRI CLI: build the systemic risk index from market and macro data.
//!
//! Commands:
//! - `ingest`: fetch indicators, resample weekly, write the cleaned panel
//! - `construct`: read the cleaned panel, build the index, write it out
//! - `run`: both stages back to back
//! - `inspect-config`: print the effective, validated configuration

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Weekday};
use clap::{Args, Parser, Subcommand};
use sri_core::data::{
    FetchProgress, FredProvider, MacroDataSource, MarketDataSource, SilentProgress,
    StdoutProgress, SyntheticSource, YahooProvider,
};
use sri_core::index::IndexResult;
use sri_runner::{run_construct, run_ingest, run_pipeline, ConstructOutcome, RunConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sri",
    about = "SRI CLI: weekly systemic risk index from VIX, MOVE and credit spreads"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch indicators, resample to weekly, and write the cleaned panel.
    Ingest {
        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },
    /// Build the index from the cleaned panel on disk.
    Construct {
        #[command(flatten)]
        config: ConfigArgs,

        /// Only write the last N weeks (the index is still fitted on all rows).
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Ingest then construct.
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        fetch: FetchArgs,

        /// Only write the last N weeks of the index table.
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Print the effective configuration as TOML.
    InspectConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to a TOML run config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the cleaned panel path (.csv or .parquet).
    #[arg(long)]
    cleaned: Option<PathBuf>,

    /// Override the index output path (.csv or .parquet).
    #[arg(long)]
    indexed: Option<PathBuf>,
}

#[derive(Args)]
struct FetchArgs {
    /// First date to request (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to request (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Weekday that labels each weekly bucket (e.g. Fri).
    #[arg(long)]
    anchor: Option<Weekday>,

    /// FRED API key.
    #[arg(long, env = "FRED_API_KEY", hide_env_values = true)]
    fred_api_key: Option<String>,

    /// Generate deterministic synthetic series instead of calling providers.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Suppress per-series progress output.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { config, fetch } => run_ingest_cmd(&config, &fetch),
        Commands::Construct { config, tail } => run_construct_cmd(&config, tail),
        Commands::Run {
            config,
            fetch,
            tail,
        } => run_pipeline_cmd(&config, &fetch, tail),
        Commands::InspectConfig { config } => run_inspect_config(&config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sri=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(args: &ConfigArgs, fetch: Option<&FetchArgs>) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(p) = &args.cleaned {
        config.artifacts.cleaned = p.clone();
    }
    if let Some(p) = &args.indexed {
        config.artifacts.indexed = p.clone();
    }
    if let Some(fetch) = fetch {
        if let Some(start) = fetch.start {
            config.ingest.start_date = start;
        }
        if let Some(anchor) = fetch.anchor {
            config.ingest.anchor = anchor;
        }
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Market and macro sources chosen by the fetch flags.
struct Sources {
    market: Box<dyn MarketDataSource>,
    macro_source: Box<dyn MacroDataSource>,
}

fn build_sources(config: &RunConfig, fetch: &FetchArgs) -> Result<Sources> {
    let end = fetch
        .end
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    if end < config.ingest.start_date {
        bail!(
            "end date {end} is before start date {}",
            config.ingest.start_date
        );
    }

    if fetch.synthetic {
        info!("using synthetic data; results will be tagged synthetic");
        return Ok(Sources {
            market: Box::new(SyntheticSource::new(end)),
            macro_source: Box::new(SyntheticSource::new(end)),
        });
    }

    let key = match fetch.fred_api_key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => bail!("a FRED API key is required: pass --fred-api-key or set FRED_API_KEY (or use --synthetic)"),
    };
    Ok(Sources {
        market: Box::new(YahooProvider::with_end(end)?),
        macro_source: Box::new(FredProvider::new(key)?),
    })
}

fn progress_for(fetch: &FetchArgs) -> Box<dyn FetchProgress> {
    if fetch.quiet {
        Box::new(SilentProgress)
    } else {
        Box::new(StdoutProgress)
    }
}

fn run_ingest_cmd(args: &ConfigArgs, fetch: &FetchArgs) -> Result<()> {
    let config = load_config(args, Some(fetch))?;
    let sources = build_sources(&config, fetch)?;
    let progress = progress_for(fetch);

    let out = run_ingest(
        &config,
        sources.market.as_ref(),
        sources.macro_source.as_ref(),
        progress.as_ref(),
    )?;

    println!(
        "Cleaned panel: {} weeks x {} columns ({} to {})",
        out.panel.n_rows(),
        out.panel.n_cols(),
        fmt_date(out.panel.first_date()),
        fmt_date(out.panel.last_date()),
    );
    println!("Wrote {}", out.artifact.display());
    println!("Manifest {}", out.manifest_path.display());
    Ok(())
}

fn run_construct_cmd(args: &ConfigArgs, tail: Option<usize>) -> Result<()> {
    let config = load_config(args, None)?;
    let out = run_construct(&config, tail)?;
    print_construct_summary(&config, &out);
    Ok(())
}

fn run_pipeline_cmd(args: &ConfigArgs, fetch: &FetchArgs, tail: Option<usize>) -> Result<()> {
    let config = load_config(args, Some(fetch))?;
    let sources = build_sources(&config, fetch)?;
    let progress = progress_for(fetch);

    let out = run_pipeline(
        &config,
        sources.market.as_ref(),
        sources.macro_source.as_ref(),
        progress.as_ref(),
        tail,
    )?;

    println!("Wrote {}", out.ingest.artifact.display());
    print_construct_summary(&config, &out.construct);
    Ok(())
}

fn run_inspect_config(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args, None)?;
    println!("# run id: {}", config.run_id());
    print!("{}", config.to_toml()?);
    Ok(())
}

fn print_construct_summary(config: &RunConfig, out: &ConstructOutcome) {
    let result: &IndexResult = &out.result;
    println!();
    println!("=== {} ===", config.index.output_column);
    println!(
        "Fitted on {} weeks ({} to {})",
        result.panel.n_rows(),
        fmt_date(result.panel.first_date()),
        fmt_date(result.panel.last_date()),
    );
    println!(
        "Explained variance (PC1): {:.1}%",
        result.explained_variance_ratio * 100.0
    );
    if result.flipped {
        println!("Orientation: sign flipped so {} loads positively", config.index.reference);
    }
    println!();
    println!("{:<16} {:>10} {:>12} {:>12}", "Factor", "Loading", "Mean", "Std");
    println!("{}", "-".repeat(53));
    for (loading, scale) in result.loadings.iter().zip(&result.standardization) {
        println!(
            "{:<16} {:>10.4} {:>12.4} {:>12.4}",
            loading.column, loading.loading, scale.mean, scale.std
        );
    }

    println!();
    let recent = out.written.tail(5);
    if let Some(values) = recent.column(&config.index.output_column) {
        println!("Latest readings:");
        for (date, v) in recent.dates().iter().zip(values) {
            println!("  {date}  {v:>6.1}");
        }
    }
    println!();
    println!("Wrote {} ({} rows)", out.artifact.display(), out.written.n_rows());
    println!("Manifest {}", out.manifest_path.display());
}

fn fmt_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}
