//! Encoding normalizer: rewrite raw partitions as canonical UTF-8 semicolon
//! CSV, dropping malformed rows on the way.
//!
//! A partition that cannot be normalized is recorded in the failed-files log
//! and simply never appears at later stages; it blocks nothing else.

use basegov_core::{PartitionKey, Stage};
use basegov_storage::{PartitionStore, StageLog};
use serde::Serialize;
use tracing::{info, warn};

use crate::table::{decode_bytes, Table};

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeSummary {
    pub normalized: usize,
    pub skipped_existing: usize,
    pub skipped_undecodable_name: usize,
    pub failed: usize,
    pub rows_dropped: usize,
    pub fallback_decodes: usize,
}

pub struct Normalizer<'a> {
    store: &'a PartitionStore,
    failed_log: &'a StageLog,
}

impl<'a> Normalizer<'a> {
    pub fn new(store: &'a PartitionStore, failed_log: &'a StageLog) -> Self {
        Self { store, failed_log }
    }

    /// Normalize every raw partition without a normalized counterpart.
    pub async fn run(&self) -> anyhow::Result<NormalizeSummary> {
        self.sweep(false).await
    }

    /// Reprocess everything, overwriting existing normalized output.
    pub async fn run_force(&self) -> anyhow::Result<NormalizeSummary> {
        self.sweep(true).await
    }

    async fn sweep(&self, force: bool) -> anyhow::Result<NormalizeSummary> {
        let mut summary = NormalizeSummary {
            normalized: 0,
            skipped_existing: 0,
            skipped_undecodable_name: 0,
            failed: 0,
            rows_dropped: 0,
            fallback_decodes: 0,
        };

        for name in self.store.list(Stage::Raw).await? {
            if let Err(err) = PartitionKey::decode(&name, Stage::Raw) {
                warn!(%name, error = %err, "skipping entry with non-canonical name");
                summary.skipped_undecodable_name += 1;
                continue;
            }

            if !force && self.store.exists(Stage::Normalized, &name).await? {
                summary.skipped_existing += 1;
                continue;
            }

            let bytes = self.store.read(Stage::Raw, &name).await?;
            let decoded = decode_bytes(&bytes);
            if decoded.used_fallback {
                warn!(%name, "invalid UTF-8; decoded as Windows-1252");
                summary.fallback_decodes += 1;
            }

            let parsed = match Table::parse(&decoded.text) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(%name, error = %err, "normalization failed");
                    self.failed_log
                        .append(&format!("Failed to process {name}: {err}"))?;
                    summary.failed += 1;
                    continue;
                }
            };
            if parsed.dropped_rows > 0 {
                // Per-row drops are counted, not individually logged.
                warn!(%name, dropped = parsed.dropped_rows, "dropped malformed rows");
                summary.rows_dropped += parsed.dropped_rows;
            }

            let canonical = match parsed.table.to_csv_bytes() {
                Ok(canonical) => canonical,
                Err(err) => {
                    warn!(%name, error = %err, "normalization failed");
                    self.failed_log
                        .append(&format!("Failed to process {name}: {err}"))?;
                    summary.failed += 1;
                    continue;
                }
            };
            self.store.write(Stage::Normalized, &name, &canonical).await?;
            summary.normalized += 1;
        }

        info!(
            normalized = summary.normalized,
            skipped = summary.skipped_existing,
            failed = summary.failed,
            rows_dropped = summary.rows_dropped,
            "normalization sweep finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NAME: &str = "csv_resultados_2015-01-01_a_2015-02-01_distrito_2_concelho_3_tipo_1.csv";

    async fn store_with_raw(bytes: &[u8]) -> (tempfile::TempDir, PartitionStore) {
        let dir = tempdir().expect("tempdir");
        let store = PartitionStore::new(dir.path());
        store.write(Stage::Raw, NAME, bytes).await.expect("write");
        (dir, store)
    }

    #[tokio::test]
    async fn windows_1252_input_becomes_utf8_output() {
        let (dir, store) = store_with_raw(b"nome;valor\nS\xE9rgio;100\n").await;
        let failed_log = StageLog::open(dir.path().join("failed_files.log")).expect("open");

        let summary = Normalizer::new(&store, &failed_log).run().await.expect("run");
        assert_eq!(summary.normalized, 1);
        assert_eq!(summary.fallback_decodes, 1);

        let out = store.read(Stage::Normalized, NAME).await.expect("read");
        assert_eq!(std::str::from_utf8(&out).unwrap(), "nome;valor\nSérgio;100\n");
    }

    #[tokio::test]
    async fn malformed_rows_are_dropped_silently() {
        let (dir, store) = store_with_raw(b"a;b\n1;2\n1;2;3\n4;5\n").await;
        let failed_log = StageLog::open(dir.path().join("failed_files.log")).expect("open");

        let summary = Normalizer::new(&store, &failed_log).run().await.expect("run");
        assert_eq!(summary.rows_dropped, 1);

        let out = store.read(Stage::Normalized, NAME).await.expect("read");
        assert_eq!(std::str::from_utf8(&out).unwrap(), "a;b\n1;2\n4;5\n");
    }

    #[tokio::test]
    async fn existing_output_is_skipped_unless_forced() {
        let (dir, store) = store_with_raw(b"a;b\n1;2\n").await;
        let failed_log = StageLog::open(dir.path().join("failed_files.log")).expect("open");
        let normalizer = Normalizer::new(&store, &failed_log);

        assert_eq!(normalizer.run().await.expect("run").normalized, 1);
        let second = normalizer.run().await.expect("run");
        assert_eq!(second.normalized, 0);
        assert_eq!(second.skipped_existing, 1);

        let forced = normalizer.run_force().await.expect("run");
        assert_eq!(forced.normalized, 1);
        assert_eq!(forced.skipped_existing, 0);
    }

    #[tokio::test]
    async fn foreign_file_names_are_ignored() {
        let dir = tempdir().expect("tempdir");
        let store = PartitionStore::new(dir.path());
        store
            .write(Stage::Raw, "debug_file.csv", b"x;y\n")
            .await
            .expect("write");
        let failed_log = StageLog::open(dir.path().join("failed_files.log")).expect("open");

        let summary = Normalizer::new(&store, &failed_log).run().await.expect("run");
        assert_eq!(summary.normalized, 0);
        assert_eq!(summary.skipped_undecodable_name, 1);
    }
}
