//! Canonical partition names and their parsing.
//!
//! The portal archive encodes a partition's whole identity in its file name:
//! `csv_resultados_<start>_a_<end>[_distrito_<d>][_concelho_<m>][_tipo_<t>].csv`
//! with trailing segments dropped as rollup levels coarsen the key, down to
//! `csv_resultados_<year>.csv` at year level. The name is the wire contract
//! with existing stores, so encoding must be bit-exact and decoding must be
//! its left inverse.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::Stage;

const ISO_DATE: &str = "%Y-%m-%d";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("malformed name: {name}")]
    MalformedName { name: String },
    #[error("invalid date token {token:?} in {name}")]
    InvalidDate { name: String, token: String },
    #[error("invalid id token {token:?} in {name}")]
    InvalidId { name: String, token: String },
}

/// Identity of a raw download: one month, one district, one municipality,
/// one contract type. This is the full key before any rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawKey {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub district: u16,
    pub municipality: u16,
    pub contract_type: u8,
}

impl From<RawKey> for PartitionKey {
    fn from(k: RawKey) -> Self {
        PartitionKey::Full {
            start: k.start,
            end: k.end,
            district: k.district,
            municipality: k.municipality,
            contract_type: k.contract_type,
        }
    }
}

/// Partition identity at any stage. Dimensions are dropped as rollup level
/// increases; the remaining fields always round-trip through the canonical
/// name for the owning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionKey {
    /// Raw and normalized stages.
    Full {
        start: NaiveDate,
        end: NaiveDate,
        district: u16,
        municipality: u16,
        contract_type: u8,
    },
    /// After the type rollup.
    TypeRolled {
        start: NaiveDate,
        end: NaiveDate,
        district: u16,
        municipality: u16,
    },
    /// After the county rollup.
    CountyRolled {
        start: NaiveDate,
        end: NaiveDate,
        district: u16,
    },
    /// After the district rollup.
    DistrictRolled { start: NaiveDate, end: NaiveDate },
    /// Year rollup and the temporal filter.
    Year { year: i32 },
}

impl PartitionKey {
    /// Canonical file name for this key.
    pub fn encode(&self) -> String {
        match *self {
            PartitionKey::Full {
                start,
                end,
                district,
                municipality,
                contract_type,
            } => format!(
                "csv_resultados_{start}_a_{end}_distrito_{district}_concelho_{municipality}_tipo_{contract_type}.csv"
            ),
            PartitionKey::TypeRolled {
                start,
                end,
                district,
                municipality,
            } => format!(
                "csv_resultados_{start}_a_{end}_distrito_{district}_concelho_{municipality}.csv"
            ),
            PartitionKey::CountyRolled {
                start,
                end,
                district,
            } => format!("csv_resultados_{start}_a_{end}_distrito_{district}.csv"),
            PartitionKey::DistrictRolled { start, end } => {
                format!("csv_resultados_{start}_a_{end}.csv")
            }
            PartitionKey::Year { year } => format!("csv_resultados_{year}.csv"),
        }
    }

    /// Parse a canonical name as a key of the shape used by `stage`. Never
    /// panics on foreign input; callers treat errors as "skip this entry".
    pub fn decode(name: &str, stage: Stage) -> Result<Self, KeyParseError> {
        let malformed = || KeyParseError::MalformedName {
            name: name.to_string(),
        };
        let stem = name.strip_suffix(".csv").ok_or_else(malformed)?;
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.first() != Some(&"csv") || parts.get(1) != Some(&"resultados") {
            return Err(malformed());
        }

        let expected_parts = match stage {
            Stage::Raw | Stage::Normalized => 11,
            Stage::TypeRollup => 9,
            Stage::CountyRollup => 7,
            Stage::DistrictRollup => 5,
            Stage::YearRollup | Stage::YearFiltered => 3,
        };
        if parts.len() != expected_parts {
            return Err(malformed());
        }

        if matches!(stage, Stage::YearRollup | Stage::YearFiltered) {
            let year = parse_id::<i32>(name, parts[2])?;
            return Ok(PartitionKey::Year { year });
        }

        if parts[3] != "a" {
            return Err(malformed());
        }
        let start = parse_date(name, parts[2])?;
        let end = parse_date(name, parts[4])?;

        if stage == Stage::DistrictRollup {
            return Ok(PartitionKey::DistrictRolled { start, end });
        }
        if parts[5] != "distrito" {
            return Err(malformed());
        }
        let district = parse_id::<u16>(name, parts[6])?;

        if stage == Stage::CountyRollup {
            return Ok(PartitionKey::CountyRolled {
                start,
                end,
                district,
            });
        }
        if parts[7] != "concelho" {
            return Err(malformed());
        }
        let municipality = parse_id::<u16>(name, parts[8])?;

        if stage == Stage::TypeRollup {
            return Ok(PartitionKey::TypeRolled {
                start,
                end,
                district,
                municipality,
            });
        }
        if parts[9] != "tipo" {
            return Err(malformed());
        }
        let contract_type = parse_id::<u8>(name, parts[10])?;

        Ok(PartitionKey::Full {
            start,
            end,
            district,
            municipality,
            contract_type,
        })
    }

    /// Calendar year of the key's start date (the declared year for `Year`).
    pub fn year(&self) -> i32 {
        match *self {
            PartitionKey::Full { start, .. }
            | PartitionKey::TypeRolled { start, .. }
            | PartitionKey::CountyRolled { start, .. }
            | PartitionKey::DistrictRolled { start, .. } => start.year(),
            PartitionKey::Year { year } => year,
        }
    }
}

fn parse_date(name: &str, token: &str) -> Result<NaiveDate, KeyParseError> {
    NaiveDate::parse_from_str(token, ISO_DATE).map_err(|_| KeyParseError::InvalidDate {
        name: name.to_string(),
        token: token.to_string(),
    })
}

fn parse_id<T: std::str::FromStr>(name: &str, token: &str) -> Result<T, KeyParseError> {
    token.parse().map_err(|_| KeyParseError::InvalidId {
        name: name.to_string(),
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn full_key_matches_portal_convention() {
        let key = PartitionKey::Full {
            start: date(2015, 1, 1),
            end: date(2015, 2, 1),
            district: 2,
            municipality: 3,
            contract_type: 1,
        };
        assert_eq!(
            key.encode(),
            "csv_resultados_2015-01-01_a_2015-02-01_distrito_2_concelho_3_tipo_1.csv"
        );
    }

    #[test]
    fn round_trip_at_every_stage() {
        let start = date(2019, 6, 1);
        let end = date(2019, 7, 1);
        let cases = [
            (
                PartitionKey::Full {
                    start,
                    end,
                    district: 14,
                    municipality: 204,
                    contract_type: 23,
                },
                Stage::Raw,
            ),
            (
                PartitionKey::Full {
                    start,
                    end,
                    district: 22,
                    municipality: 0,
                    contract_type: 1,
                },
                Stage::Normalized,
            ),
            (
                PartitionKey::TypeRolled {
                    start,
                    end,
                    district: 14,
                    municipality: 204,
                },
                Stage::TypeRollup,
            ),
            (
                PartitionKey::CountyRolled {
                    start,
                    end,
                    district: 14,
                },
                Stage::CountyRollup,
            ),
            (
                PartitionKey::DistrictRolled { start, end },
                Stage::DistrictRollup,
            ),
            (PartitionKey::Year { year: 2019 }, Stage::YearRollup),
            (PartitionKey::Year { year: 2019 }, Stage::YearFiltered),
        ];
        for (key, stage) in cases {
            let name = key.encode();
            assert_eq!(PartitionKey::decode(&name, stage), Ok(key), "{name}");
        }
    }

    #[test]
    fn wrong_token_count_is_malformed() {
        let err = PartitionKey::decode(
            "csv_resultados_2015-01-01_a_2015-02-01_distrito_2.csv",
            Stage::Raw,
        )
        .unwrap_err();
        assert!(matches!(err, KeyParseError::MalformedName { .. }));
    }

    #[test]
    fn bad_date_token_is_invalid_date() {
        let err = PartitionKey::decode(
            "csv_resultados_2015-13-01_a_2015-02-01.csv",
            Stage::DistrictRollup,
        )
        .unwrap_err();
        assert!(matches!(err, KeyParseError::InvalidDate { .. }));
    }

    #[test]
    fn foreign_files_do_not_decode() {
        for name in ["debug_file.csv", "processing_log.log", "notes.txt"] {
            assert!(PartitionKey::decode(name, Stage::Raw).is_err());
        }
    }

    #[test]
    fn year_name_round_trips() {
        let key = PartitionKey::Year { year: 2015 };
        assert_eq!(key.encode(), "csv_resultados_2015.csv");
        assert_eq!(
            PartitionKey::decode("csv_resultados_2015.csv", Stage::YearRollup),
            Ok(key)
        );
    }
}
