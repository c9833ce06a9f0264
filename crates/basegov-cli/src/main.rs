use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use basegov_core::{DownloadSpace, Lookups};
use basegov_pipeline::{Pipeline, PipelineConfig};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "basegov-cli")]
#[command(about = "BASE.gov contract data pipeline")]
struct Cli {
    /// Partition store root directory.
    #[arg(long, default_value = "./data")]
    store: PathBuf,

    /// First month covered by the download space (first day).
    #[arg(long, default_value = "2015-01-01")]
    from: NaiveDate,

    /// Last month covered by the download space (any day inside it).
    #[arg(long, default_value = "2024-12-31")]
    to: NaiveDate,

    /// Optional YAML override for the download space.
    #[arg(long)]
    space: Option<PathBuf>,

    /// Optional YAML override for the lookup tables.
    #[arg(long)]
    lookups: Option<PathBuf>,

    /// User-Agent header sent to the portal.
    #[arg(long)]
    user_agent: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every partition missing from the raw store.
    Download,
    /// Append raw partition row counts to the large/small audit logs.
    Audit,
    /// Rewrite raw partitions as canonical UTF-8 semicolon CSV.
    Normalize {
        /// Reprocess partitions whose normalized output already exists.
        #[arg(long)]
        force: bool,
    },
    /// Run the four rollup levels (type, county, district, year).
    Rollup,
    /// Drop year-partition rows whose contract date disagrees with the year.
    FilterYears,
    /// Run every stage in order.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let pipeline = Pipeline::new(build_config(&cli)?)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Download => {
            let s = pipeline.download().await?;
            println!(
                "download complete: run_id={} fetched={} present={} rejected={} failed={} short_pages={}",
                s.run_id, s.fetched, s.already_present, s.rejected, s.failed, s.count_mismatches
            );
        }
        Commands::Audit => {
            let s = pipeline.audit().await?;
            println!(
                "audit complete: audited={} large={} small={} unreadable={}",
                s.audited, s.large, s.small, s.unreadable
            );
        }
        Commands::Normalize { force } => {
            let s = pipeline.normalize(force).await?;
            println!(
                "normalize complete: normalized={} skipped={} failed={} rows_dropped={}",
                s.normalized, s.skipped_existing, s.failed, s.rows_dropped
            );
        }
        Commands::Rollup => {
            for level in pipeline.rollup().await? {
                println!(
                    "rollup {}: groups={} merged={} skipped={} rows={}",
                    level.level, level.groups, level.inputs_merged, level.inputs_skipped, level.rows_out
                );
            }
        }
        Commands::FilterYears => {
            let s = pipeline.filter_years().await?;
            println!(
                "filter complete: written={} skipped_existing={} empty={} kept={} dropped={}",
                s.filtered, s.skipped_existing, s.empty_not_written, s.rows_kept, s.rows_dropped
            );
        }
        Commands::Run => {
            let s = pipeline.run_all().await?;
            println!(
                "pipeline run {} complete: fetched={} normalized={} year_files={}",
                s.run_id, s.download.fetched, s.normalize.normalized, s.filter.filtered
            );
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::builtin(&cli.store, cli.from, cli.to);

    if let Some(path) = &cli.space {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        config.space =
            DownloadSpace::from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    }
    if let Some(path) = &cli.lookups {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        config.lookups =
            Lookups::from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    }

    if let Some(user_agent) = &cli.user_agent {
        config.fetcher.user_agent = user_agent.clone();
    }
    config.fetcher.timeout = Duration::from_secs(cli.timeout_secs);

    Ok(config)
}
