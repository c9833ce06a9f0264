//! In-memory tabular model for partitions: a header and string rows, read
//! from and written to semicolon-delimited CSV.
//!
//! Parsing is deliberately tolerant: the portal's exports contain stray
//! delimiters and broken quoting, so rows whose field count disagrees with
//! the header are dropped and counted rather than failing the partition.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;
use thiserror::Error;

pub const DELIMITER: u8 = b';';

#[derive(Debug, Error)]
pub enum TableError {
    #[error("reading csv header: {0}")]
    Header(csv::Error),
    #[error("serializing csv: {0}")]
    Write(csv::Error),
}

/// Result of decoding raw partition bytes to text.
#[derive(Debug)]
pub struct DecodedText<'a> {
    pub text: Cow<'a, str>,
    /// True when strict UTF-8 failed and the Windows-1252 fallback was used.
    pub used_fallback: bool,
}

/// Decode bytes as UTF-8, falling back to Windows-1252. The fallback cannot
/// fail: every byte sequence is valid Windows-1252.
pub fn decode_bytes(bytes: &[u8]) -> DecodedText<'_> {
    match std::str::from_utf8(bytes) {
        Ok(text) => DecodedText {
            text: Cow::Borrowed(text),
            used_fallback: false,
        },
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            DecodedText {
                text,
                used_fallback: true,
            }
        }
    }
}

/// An ordered header plus rows of string values. Rows always have exactly
/// `columns.len()` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A parsed table plus how many malformed rows were discarded on the way.
#[derive(Debug)]
pub struct ParsedTable {
    pub table: Table,
    pub dropped_rows: usize,
}

impl Table {
    /// Parse semicolon CSV, dropping rows whose field count differs from
    /// the header.
    pub fn parse(text: &str) -> Result<ParsedTable, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .flexible(true)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(TableError::Header)?
            .iter()
            .map(str::to_owned)
            .collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut dropped_rows = 0usize;
        for record in reader.records() {
            match record {
                Ok(record) if record.len() == width => {
                    rows.push(record.iter().map(str::to_owned).collect());
                }
                // Wrong shape or unreadable record: drop, count, continue.
                Ok(_) | Err(_) => dropped_rows += 1,
            }
        }

        Ok(ParsedTable {
            table: Table { columns, rows },
            dropped_rows,
        })
    }

    /// Serialize canonically: UTF-8, semicolon delimiter, header first. An
    /// entirely empty table (no columns) serializes to no bytes.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, TableError> {
        if self.columns.is_empty() {
            return Ok(Vec::new());
        }
        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(Vec::new());
        writer.write_record(&self.columns).map_err(TableError::Write)?;
        for row in &self.rows {
            writer.write_record(row).map_err(TableError::Write)?;
        }
        writer
            .into_inner()
            .map_err(|e| TableError::Write(e.into_error().into()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Set `name` to `value` on every row, creating the column if absent and
    /// overwriting it if present.
    pub fn set_column(&mut self, name: &str, value: &str) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.to_string();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.to_string());
                }
            }
        }
    }

    /// Append another table's rows as a pure union: the result carries the
    /// union of columns, with empty strings where a side lacks a column. No
    /// deduplication, no reordering.
    pub fn append_rows(&mut self, other: Table) {
        if self.columns.is_empty() {
            *self = other;
            return;
        }

        let mut mapping = Vec::with_capacity(other.columns.len());
        for column in &other.columns {
            let idx = match self.column_index(column) {
                Some(idx) => idx,
                None => {
                    self.columns.push(column.clone());
                    for row in &mut self.rows {
                        row.push(String::new());
                    }
                    self.columns.len() - 1
                }
            };
            mapping.push(idx);
        }

        let width = self.columns.len();
        for other_row in other.rows {
            let mut row = vec![String::new(); width];
            for (value, &idx) in other_row.into_iter().zip(&mapping) {
                row[idx] = value;
            }
            self.rows.push(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_bytes_decode_without_fallback() {
        let decoded = decode_bytes("Águeda;Óbidos".as_bytes());
        assert!(!decoded.used_fallback);
        assert_eq!(decoded.text, "Águeda;Óbidos");
    }

    #[test]
    fn invalid_utf8_falls_back_to_windows_1252() {
        // "Águeda" in Windows-1252: 0xC1 for Á.
        let bytes = b"\xC1gueda";
        let decoded = decode_bytes(bytes);
        assert!(decoded.used_fallback);
        assert_eq!(decoded.text, "Águeda");
    }

    #[test]
    fn fallback_matches_direct_windows_1252_decoding() {
        let bytes = b"nome;pre\xE7o\nS\xE9rgio;100\n";
        let decoded = decode_bytes(bytes);
        let (direct, _, _) = WINDOWS_1252.decode(bytes);
        assert_eq!(decoded.text, direct);
    }

    #[test]
    fn malformed_rows_are_dropped_and_counted() {
        let parsed = Table::parse("a;b;c\n1;2;3\n1;2\n4;5;6\n1;2;3;4\n").unwrap();
        assert_eq!(parsed.dropped_rows, 2);
        assert_eq!(parsed.table.len(), 2);
        assert_eq!(parsed.table.columns, ["a", "b", "c"]);
    }

    #[test]
    fn serialization_is_semicolon_delimited() {
        let parsed = Table::parse("a;b\n1;2\n").unwrap();
        let bytes = parsed.table.to_csv_bytes().unwrap();
        assert_eq!(bytes, b"a;b\n1;2\n");
    }

    #[test]
    fn set_column_creates_then_overwrites() {
        let mut table = Table::parse("a\n1\n2\n").unwrap().table;
        table.set_column("Tipo", "1");
        assert_eq!(table.rows[0], ["1", "1"]);
        table.set_column("Tipo", "2");
        assert_eq!(table.rows[1], ["2", "2"]);
    }

    #[test]
    fn append_takes_the_union_of_columns() {
        let mut left = Table::parse("a;b\n1;2\n").unwrap().table;
        let right = Table::parse("b;c\n3;4\n").unwrap().table;
        left.append_rows(right);
        assert_eq!(left.columns, ["a", "b", "c"]);
        assert_eq!(left.rows[0], ["1", "2", ""]);
        assert_eq!(left.rows[1], ["", "3", "4"]);
    }

    #[test]
    fn append_into_empty_adopts_the_other_table() {
        let mut empty = Table::default();
        let other = Table::parse("a\n1\n").unwrap().table;
        empty.append_rows(other.clone());
        assert_eq!(empty, other);
    }

    #[test]
    fn empty_table_serializes_to_nothing() {
        assert!(Table::default().to_csv_bytes().unwrap().is_empty());
    }
}
