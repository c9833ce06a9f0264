//! Temporal consistency filter: drop rows whose contract date falls outside
//! the year their partition was filed under.
//!
//! Two asymmetries with the rollup levels are intentional and preserved from
//! the archive's behavior: an already-existing output is skipped even if the
//! inputs have since changed (first successful filter is final), and an
//! empty filtered result is not written at all.

use basegov_core::{PartitionKey, Stage};
use basegov_storage::PartitionStore;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::table::{decode_bytes, Table};

/// The designated contract-date field in the portal's export schema.
pub const CONTRACT_DATE_COLUMN: &str = "Data de Celebração do Contrato";

/// Day-first formats tried in order; ISO last for already-normalized values.
const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, Serialize)]
pub struct FilterSummary {
    pub filtered: usize,
    pub skipped_existing: usize,
    pub skipped_no_date_column: usize,
    pub empty_not_written: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

pub struct TemporalFilter<'a> {
    store: &'a PartitionStore,
}

impl<'a> TemporalFilter<'a> {
    pub fn new(store: &'a PartitionStore) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> anyhow::Result<FilterSummary> {
        let mut summary = FilterSummary {
            filtered: 0,
            skipped_existing: 0,
            skipped_no_date_column: 0,
            empty_not_written: 0,
            rows_kept: 0,
            rows_dropped: 0,
        };

        for name in self.store.list(Stage::YearRollup).await? {
            let year = match PartitionKey::decode(&name, Stage::YearRollup) {
                Ok(key) => key.year(),
                Err(err) => {
                    warn!(%name, error = %err, "skipping entry with non-canonical name");
                    continue;
                }
            };

            if self.store.exists(Stage::YearFiltered, &name).await? {
                // First successful filter is final; stale output stays.
                info!(%name, "filtered output exists, skipping");
                summary.skipped_existing += 1;
                continue;
            }

            let bytes = self.store.read(Stage::YearRollup, &name).await?;
            let decoded = decode_bytes(&bytes);
            let table = match Table::parse(&decoded.text) {
                Ok(parsed) => parsed.table,
                Err(err) => {
                    warn!(%name, error = %err, "unparseable year partition, skipping");
                    continue;
                }
            };

            let Some(date_idx) = table.column_index(CONTRACT_DATE_COLUMN) else {
                warn!(%name, column = CONTRACT_DATE_COLUMN, "date column missing, skipping");
                summary.skipped_no_date_column += 1;
                continue;
            };

            let total = table.len();
            let mut kept = Table {
                columns: table.columns.clone(),
                rows: Vec::new(),
            };
            for row in table.rows {
                if parse_contract_date(&row[date_idx]).map(|d| d.year()) == Some(year) {
                    kept.rows.push(row);
                }
            }

            summary.rows_kept += kept.len();
            summary.rows_dropped += total - kept.len();

            if kept.is_empty() {
                info!(%name, year, "no rows match the declared year, output not written");
                summary.empty_not_written += 1;
                continue;
            }

            self.store
                .write(Stage::YearFiltered, &name, &kept.to_csv_bytes()?)
                .await?;
            summary.filtered += 1;
        }

        info!(
            filtered = summary.filtered,
            skipped_existing = summary.skipped_existing,
            rows_kept = summary.rows_kept,
            rows_dropped = summary.rows_dropped,
            "temporal filter finished"
        );
        Ok(summary)
    }
}

/// Parse a contract date, day-first; unparseable values become `None`.
pub fn parse_contract_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn dates_parse_day_first() {
        assert_eq!(
            parse_contract_date("15/01/2020"),
            NaiveDate::from_ymd_opt(2020, 1, 15)
        );
        assert_eq!(
            parse_contract_date("15-01-2020"),
            NaiveDate::from_ymd_opt(2020, 1, 15)
        );
        assert_eq!(
            parse_contract_date("2019-03-01"),
            NaiveDate::from_ymd_opt(2019, 3, 1)
        );
        assert_eq!(parse_contract_date("não aplicável"), None);
        assert_eq!(parse_contract_date(""), None);
    }

    fn year_csv() -> String {
        format!(
            "{CONTRACT_DATE_COLUMN};objeto\n2019-03-01;a\n15/01/2020;b\ngarbage;c\n"
        )
    }

    #[tokio::test]
    async fn keeps_only_rows_matching_the_declared_year() {
        let dir = tempdir().expect("tempdir");
        let store = PartitionStore::new(dir.path());
        let name = PartitionKey::Year { year: 2019 }.encode();
        store
            .write(Stage::YearRollup, &name, year_csv().as_bytes())
            .await
            .expect("write");

        let summary = TemporalFilter::new(&store).run().await.expect("run");
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.rows_kept, 1);
        assert_eq!(summary.rows_dropped, 2);

        let bytes = store.read(Stage::YearFiltered, &name).await.expect("read");
        let table = Table::parse(std::str::from_utf8(&bytes).unwrap())
            .expect("parse")
            .table;
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][1], "a");
    }

    #[tokio::test]
    async fn empty_result_is_not_written() {
        let dir = tempdir().expect("tempdir");
        let store = PartitionStore::new(dir.path());
        let name = PartitionKey::Year { year: 2018 }.encode();
        store
            .write(Stage::YearRollup, &name, year_csv().as_bytes())
            .await
            .expect("write");

        let summary = TemporalFilter::new(&store).run().await.expect("run");
        assert_eq!(summary.filtered, 0);
        assert_eq!(summary.empty_not_written, 1);
        assert!(!store
            .exists(Stage::YearFiltered, &name)
            .await
            .expect("exists"));
    }

    #[tokio::test]
    async fn existing_output_is_never_overwritten() {
        let dir = tempdir().expect("tempdir");
        let store = PartitionStore::new(dir.path());
        let name = PartitionKey::Year { year: 2019 }.encode();
        store
            .write(Stage::YearRollup, &name, year_csv().as_bytes())
            .await
            .expect("write");
        store
            .write(Stage::YearFiltered, &name, b"stale\n")
            .await
            .expect("write");

        let summary = TemporalFilter::new(&store).run().await.expect("run");
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.filtered, 0);
        let bytes = store.read(Stage::YearFiltered, &name).await.expect("read");
        assert_eq!(bytes, b"stale\n");
    }

    #[tokio::test]
    async fn missing_date_column_skips_the_partition() {
        let dir = tempdir().expect("tempdir");
        let store = PartitionStore::new(dir.path());
        let name = PartitionKey::Year { year: 2019 }.encode();
        store
            .write(Stage::YearRollup, &name, b"objeto;preco\na;1\n")
            .await
            .expect("write");

        let summary = TemporalFilter::new(&store).run().await.expect("run");
        assert_eq!(summary.skipped_no_date_column, 1);
        assert!(!store
            .exists(Stage::YearFiltered, &name)
            .await
            .expect("exists"));
    }
}
