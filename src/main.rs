//! picarc - decode PICA+ dumps into per-language field listings.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use picarc::Config;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for picarc
#[derive(Parser, Debug)]
#[command(name = "picarc")]
#[command(about = "Decode PICA+ dumps and split selected fields by record language")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PICARC_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the JSON statistics report
    #[arg(short, long)]
    stats: Option<PathBuf>,

    /// Sink for records without a recognized language
    #[arg(short, long)]
    fallback: Option<PathBuf>,

    /// Log every output line and record boundary
    #[arg(short, long)]
    verbose: bool,

    /// Only compute statistics; do not write the language sinks
    #[arg(long)]
    stats_only: bool,

    /// Source files; replace the configured list when given
    sources: Vec<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => Config::default(),
        };

        if !self.sources.is_empty() {
            config.sources = self.sources;
        }
        if let Some(stats) = self.stats {
            config.statistics = stats;
        }
        if let Some(fallback) = self.fallback {
            config.fallback = fallback;
        }
        config.verbose |= self.verbose;
        if self.stats_only {
            config.text_output = false;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    let config = Args::parse().into_config()?;

    let default_filter = if config.verbose {
        "picarc=debug"
    } else {
        "picarc=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if config.sources.is_empty() {
        anyhow::bail!("No sources given; pass them as arguments or list them in the configuration");
    }
    info!(sources = config.sources.len(), "Starting picarc");

    let report = picarc::run(&config).context("Decoding run failed")?;
    println!("{report}");

    if report.totals.failed_sources > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
