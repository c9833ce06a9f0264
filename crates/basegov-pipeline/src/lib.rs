//! The hierarchical reconciliation pipeline: gap-filling acquisition,
//! encoding normalization, four rollup levels, and the temporal filter,
//! wired over one partition store.

pub mod audit;
pub mod download;
pub mod filter;
pub mod normalize;
pub mod rollup;
pub mod table;

use std::path::PathBuf;

use anyhow::{Context, Result};
use basegov_core::{DownloadSpace, Lookups};
use basegov_storage::{FetcherConfig, PartitionStore, PortalFetcher, StageLog};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub use audit::{audit_row_counts, AuditSummary};
pub use download::{DownloadSummary, Fetch, GapFiller, EXPECTED_RECORDS};
pub use filter::{FilterSummary, TemporalFilter, CONTRACT_DATE_COLUMN};
pub use normalize::{NormalizeSummary, Normalizer};
pub use rollup::{RollupEngine, RollupLevelSummary};
pub use table::Table;

pub const CRATE_NAME: &str = "basegov-pipeline";

/// Explicit configuration for a pipeline instance: store and log locations,
/// the download space, the lookup tables, and the portal client settings.
/// Replaces the archive's module-level folder and logging globals.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub store_root: PathBuf,
    pub logs_dir: PathBuf,
    pub space: DownloadSpace,
    pub lookups: Lookups,
    pub fetcher: FetcherConfig,
}

impl PipelineConfig {
    /// Built-in space and lookups over the given store root and bounds.
    pub fn builtin(store_root: impl Into<PathBuf>, first: NaiveDate, last: NaiveDate) -> Self {
        let store_root = store_root.into();
        let logs_dir = store_root.join("Logs");
        Self {
            store_root,
            logs_dir,
            space: DownloadSpace::builtin(first, last),
            lookups: Lookups::builtin(),
            fetcher: FetcherConfig::default(),
        }
    }
}

/// Summary of one full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub download: DownloadSummary,
    pub audit: AuditSummary,
    pub normalize: NormalizeSummary,
    pub rollups: Vec<RollupLevelSummary>,
    pub filter: FilterSummary,
}

pub struct Pipeline {
    config: PipelineConfig,
    store: PartitionStore,
    fetcher: PortalFetcher,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let store = PartitionStore::new(config.store_root.clone());
        let fetcher =
            PortalFetcher::new(config.fetcher.clone()).context("building portal fetcher")?;
        Ok(Self {
            config,
            store,
            fetcher,
        })
    }

    pub fn store(&self) -> &PartitionStore {
        &self.store
    }

    pub async fn download(&self) -> Result<DownloadSummary> {
        GapFiller::new(&self.store, &self.fetcher)
            .run(&self.config.space)
            .await
    }

    pub async fn audit(&self) -> Result<AuditSummary> {
        let large = StageLog::open(self.config.logs_dir.join("large_files.log"))?;
        let small = StageLog::open(self.config.logs_dir.join("small_files.log"))?;
        audit_row_counts(&self.store, &large, &small).await
    }

    pub async fn normalize(&self, force: bool) -> Result<NormalizeSummary> {
        let failed = StageLog::open(self.config.logs_dir.join("failed_files.log"))?;
        let normalizer = Normalizer::new(&self.store, &failed);
        if force {
            normalizer.run_force().await
        } else {
            normalizer.run().await
        }
    }

    pub async fn rollup(&self) -> Result<Vec<RollupLevelSummary>> {
        RollupEngine::new(&self.store, &self.config.lookups)
            .run_all()
            .await
    }

    pub async fn filter_years(&self) -> Result<FilterSummary> {
        TemporalFilter::new(&self.store).run().await
    }

    /// All stages in order. Each stage is independently re-runnable; running
    /// the whole chain is just the common case.
    pub async fn run_all(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);
        async {
            let download = self.download().await?;
            let audit = self.audit().await?;
            let normalize = self.normalize(false).await?;
            let rollups = self.rollup().await?;
            let filter = self.filter_years().await?;

            Ok(RunSummary {
                run_id,
                download,
                audit,
                normalize,
                rollups,
                filter,
            })
        }
        .instrument(span)
        .await
    }
}
