//! The four rollup levels: ordered group-by-concatenate passes that merge
//! partitions sharing a key prefix and tag each contribution with the
//! dimension being rolled away.
//!
//! Every level recomputes its outputs from the current inputs on every run
//! (no skip-if-exists), and concatenation is a pure union of rows: append
//! order, no deduplication, union of columns with empty strings where an
//! input lacks one. A group whose inputs all failed to load still writes its
//! (empty) output so later stages see the group at all.

use std::collections::BTreeMap;

use basegov_core::{Lookups, PartitionKey, Stage};
use basegov_storage::PartitionStore;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::table::{decode_bytes, Table};

/// Column names injected by the rollup levels.
pub const COL_TIPO: &str = "Tipo";
pub const COL_TIPO_DESCRICAO: &str = "TipoDescricao";
pub const COL_CONCELHO_ID: &str = "ConcelhoId";
pub const COL_CONCELHO_NOME: &str = "ConcelhoNome";
pub const COL_DISTRITO_ID: &str = "DistritoId";
pub const COL_DISTRITO_NOME: &str = "DistritoNome";

/// Sentinel label for a contract type absent from the lookup table.
pub const UNKNOWN_TYPE_LABEL: &str = "Desconhecido";

#[derive(Debug, Clone, Serialize)]
pub struct RollupLevelSummary {
    pub level: &'static str,
    pub groups: usize,
    pub inputs_merged: usize,
    pub inputs_skipped: usize,
    pub rows_out: usize,
}

pub struct RollupEngine<'a> {
    store: &'a PartitionStore,
    lookups: &'a Lookups,
}

impl<'a> RollupEngine<'a> {
    pub fn new(store: &'a PartitionStore, lookups: &'a Lookups) -> Self {
        Self { store, lookups }
    }

    /// Run the four levels in order.
    pub async fn run_all(&self) -> anyhow::Result<Vec<RollupLevelSummary>> {
        Ok(vec![
            self.rollup_types().await?,
            self.rollup_counties().await?,
            self.rollup_districts().await?,
            self.rollup_years().await?,
        ])
    }

    /// Level 1: merge contract types. Groups normalized partitions sharing
    /// (month, district, municipality); tags each input with its type id
    /// (straight from the key) and the descriptive type label.
    pub async fn rollup_types(&self) -> anyhow::Result<RollupLevelSummary> {
        type Group = (NaiveDate, NaiveDate, u16, u16);
        let mut groups: BTreeMap<Group, Vec<(String, u8)>> = BTreeMap::new();
        for name in self.store.list(Stage::Normalized).await? {
            match PartitionKey::decode(&name, Stage::Normalized) {
                Ok(PartitionKey::Full {
                    start,
                    end,
                    district,
                    municipality,
                    contract_type,
                }) => groups
                    .entry((start, end, district, municipality))
                    .or_default()
                    .push((name, contract_type)),
                Ok(_) => unreachable!("normalized stage decodes to full keys"),
                Err(err) => warn!(%name, error = %err, "skipping entry with non-canonical name"),
            }
        }

        let mut summary = new_summary("type", groups.len());
        for ((start, end, district, municipality), inputs) in groups {
            let mut combined = Table::default();
            for (name, contract_type) in inputs {
                let mut table = match self.load_table(Stage::Normalized, &name).await {
                    Ok(table) => table,
                    Err(err) => {
                        warn!(%name, error = %err, "skipping unreadable rollup input");
                        summary.inputs_skipped += 1;
                        continue;
                    }
                };
                table.set_column(COL_TIPO, &contract_type.to_string());
                let label = match self.lookups.type_label(contract_type).resolved() {
                    Some(label) => label.to_string(),
                    None => {
                        warn!(%name, contract_type, "no label for contract type; using sentinel");
                        UNKNOWN_TYPE_LABEL.to_string()
                    }
                };
                table.set_column(COL_TIPO_DESCRICAO, &label);
                combined.append_rows(table);
                summary.inputs_merged += 1;
            }

            let out_key = PartitionKey::TypeRolled {
                start,
                end,
                district,
                municipality,
            };
            summary.rows_out += combined.len();
            self.write_output(Stage::TypeRollup, out_key, &combined).await?;
        }

        log_summary(&summary);
        Ok(summary)
    }

    /// Level 2: merge municipalities within a district, tagging each input
    /// with its municipality id, the municipality name, and the district id.
    pub async fn rollup_counties(&self) -> anyhow::Result<RollupLevelSummary> {
        type Group = (NaiveDate, NaiveDate, u16);
        let mut groups: BTreeMap<Group, Vec<(String, u16)>> = BTreeMap::new();
        for name in self.store.list(Stage::TypeRollup).await? {
            match PartitionKey::decode(&name, Stage::TypeRollup) {
                Ok(PartitionKey::TypeRolled {
                    start,
                    end,
                    district,
                    municipality,
                }) => groups
                    .entry((start, end, district))
                    .or_default()
                    .push((name, municipality)),
                Ok(_) => unreachable!("type rollup stage decodes to type-rolled keys"),
                Err(err) => warn!(%name, error = %err, "skipping entry with non-canonical name"),
            }
        }

        let mut summary = new_summary("county", groups.len());
        for ((start, end, district), inputs) in groups {
            let mut combined = Table::default();
            for (name, municipality) in inputs {
                let mut table = match self.load_table(Stage::TypeRollup, &name).await {
                    Ok(table) => table,
                    Err(err) => {
                        warn!(%name, error = %err, "skipping unreadable rollup input");
                        summary.inputs_skipped += 1;
                        continue;
                    }
                };
                table.set_column(COL_CONCELHO_ID, &municipality.to_string());
                let name_label = match self.lookups.municipality_name(municipality).resolved() {
                    Some(label) => label.to_string(),
                    None => {
                        warn!(%name, municipality, "no name for municipality; using sentinel");
                        format!("Unknown ({municipality})")
                    }
                };
                table.set_column(COL_CONCELHO_NOME, &name_label);
                table.set_column(COL_DISTRITO_ID, &district.to_string());
                combined.append_rows(table);
                summary.inputs_merged += 1;
            }

            let out_key = PartitionKey::CountyRolled {
                start,
                end,
                district,
            };
            summary.rows_out += combined.len();
            self.write_output(Stage::CountyRollup, out_key, &combined).await?;
        }

        log_summary(&summary);
        Ok(summary)
    }

    /// Level 3: merge districts within a month. A district id absent from
    /// the lookup table (the table covers the aggregate ids too) marks the
    /// input as bad data and the input is skipped, not sentinel-labelled.
    pub async fn rollup_districts(&self) -> anyhow::Result<RollupLevelSummary> {
        let mut groups: BTreeMap<(NaiveDate, NaiveDate), Vec<(String, u16)>> = BTreeMap::new();
        for name in self.store.list(Stage::CountyRollup).await? {
            match PartitionKey::decode(&name, Stage::CountyRollup) {
                Ok(PartitionKey::CountyRolled {
                    start,
                    end,
                    district,
                }) => groups
                    .entry((start, end))
                    .or_default()
                    .push((name, district)),
                Ok(_) => unreachable!("county rollup stage decodes to county-rolled keys"),
                Err(err) => warn!(%name, error = %err, "skipping entry with non-canonical name"),
            }
        }

        let mut summary = new_summary("district", groups.len());
        for ((start, end), inputs) in groups {
            let mut combined = Table::default();
            for (name, district) in inputs {
                let district_name = match self.lookups.district_name(district).resolved() {
                    Some(label) => label.to_string(),
                    None => {
                        warn!(%name, district, "unknown district id; skipping input");
                        summary.inputs_skipped += 1;
                        continue;
                    }
                };
                let mut table = match self.load_table(Stage::CountyRollup, &name).await {
                    Ok(table) => table,
                    Err(err) => {
                        warn!(%name, error = %err, "skipping unreadable rollup input");
                        summary.inputs_skipped += 1;
                        continue;
                    }
                };
                table.set_column(COL_DISTRITO_ID, &district.to_string());
                table.set_column(COL_DISTRITO_NOME, &district_name);
                combined.append_rows(table);
                summary.inputs_merged += 1;
            }

            let out_key = PartitionKey::DistrictRolled { start, end };
            summary.rows_out += combined.len();
            self.write_output(Stage::DistrictRollup, out_key, &combined).await?;
        }

        log_summary(&summary);
        Ok(summary)
    }

    /// Level 4: merge months into calendar years keyed by the range's start
    /// date. Plain concatenation, no tag injection.
    pub async fn rollup_years(&self) -> anyhow::Result<RollupLevelSummary> {
        let mut groups: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        for name in self.store.list(Stage::DistrictRollup).await? {
            match PartitionKey::decode(&name, Stage::DistrictRollup) {
                Ok(key @ PartitionKey::DistrictRolled { .. }) => {
                    groups.entry(key.year()).or_default().push(name)
                }
                Ok(_) => unreachable!("district rollup stage decodes to district-rolled keys"),
                Err(err) => warn!(%name, error = %err, "skipping entry with non-canonical name"),
            }
        }

        let mut summary = new_summary("year", groups.len());
        for (year, inputs) in groups {
            let mut combined = Table::default();
            for name in inputs {
                match self.load_table(Stage::DistrictRollup, &name).await {
                    Ok(table) => {
                        combined.append_rows(table);
                        summary.inputs_merged += 1;
                    }
                    Err(err) => {
                        warn!(%name, error = %err, "skipping unreadable rollup input");
                        summary.inputs_skipped += 1;
                    }
                }
            }

            summary.rows_out += combined.len();
            self.write_output(Stage::YearRollup, PartitionKey::Year { year }, &combined)
                .await?;
        }

        log_summary(&summary);
        Ok(summary)
    }

    async fn load_table(&self, stage: Stage, name: &str) -> anyhow::Result<Table> {
        let bytes = self.store.read(stage, name).await?;
        let decoded = decode_bytes(&bytes);
        let parsed = Table::parse(&decoded.text)?;
        if parsed.dropped_rows > 0 {
            warn!(%name, dropped = parsed.dropped_rows, "dropped malformed rows while loading");
        }
        Ok(parsed.table)
    }

    async fn write_output(
        &self,
        stage: Stage,
        key: PartitionKey,
        table: &Table,
    ) -> anyhow::Result<()> {
        let name = key.encode();
        let bytes = table.to_csv_bytes()?;
        self.store.write(stage, &name, &bytes).await
    }
}

fn new_summary(level: &'static str, groups: usize) -> RollupLevelSummary {
    RollupLevelSummary {
        level,
        groups,
        inputs_merged: 0,
        inputs_skipped: 0,
        rows_out: 0,
    }
}

fn log_summary(summary: &RollupLevelSummary) {
    info!(
        level = summary.level,
        groups = summary.groups,
        inputs_merged = summary.inputs_merged,
        inputs_skipped = summary.inputs_skipped,
        rows_out = summary.rows_out,
        "rollup level finished"
    );
}
