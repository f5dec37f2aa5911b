//! Command-line entrypoint for converting bulk news archives.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bulknews_core::{ConverterConfig, NewsConverter};
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Convert vendor bulk news archives into per-date content and entity indexes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding bulkfile_<start>_<end>.tar.gz archives
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Root of the output tree
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Only process the two archives bracketing this date (YYYYMMDD)
    #[arg(long, env = "BULKNEWS_DEPLOYMENT_DATE", value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Outstanding writes tolerated before the producer drains
    #[arg(long)]
    max_outstanding: Option<usize>,

    /// Persistence worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|err| format!("expected YYYYMMDD, got {value:?}: {err}"))
}

fn load_config(args: &Args) -> Result<ConverterConfig> {
    let mut config = match &args.config {
        Some(path) => ConverterConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConverterConfig::default(),
    };
    if let Some(dir) = &args.source_dir {
        config.source_dir.clone_from(dir);
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    if args.date.is_some() {
        config.target_date = args.date;
    }
    if let Some(limit) = args.max_outstanding {
        config.max_outstanding = limit;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let summary = NewsConverter::new(config)
        .run()
        .context("conversion failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("bulknews={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("bulknews {}", bulknews_core::BULKNEWS_CORE_VERSION);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
