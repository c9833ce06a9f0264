use serde::{Deserialize, Serialize};

/// Pipeline stages, in processing order. Each stage owns one directory in
/// the partition store; directory names follow the portal archive layout so
/// existing stores remain readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Raw portal responses, one file per (month, district, municipality, type).
    Raw,
    /// Raw partitions rewritten as canonical UTF-8 semicolon CSV.
    Normalized,
    /// Contract-type rollup: one file per (month, district, municipality).
    TypeRollup,
    /// Municipality rollup: one file per (month, district).
    CountyRollup,
    /// District rollup: one file per month.
    DistrictRollup,
    /// Year rollup: one file per calendar year.
    YearRollup,
    /// Year rollup with temporally inconsistent rows removed.
    YearFiltered,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Raw,
        Stage::Normalized,
        Stage::TypeRollup,
        Stage::CountyRollup,
        Stage::DistrictRollup,
        Stage::YearRollup,
        Stage::YearFiltered,
    ];

    /// Store subdirectory for this stage.
    pub fn dir_name(self) -> &'static str {
        match self {
            Stage::Raw => "01_RawData",
            Stage::Normalized => "07_RawDataFinalMonthFixed",
            Stage::TypeRollup => "08_RawDataMonthWithTipo",
            Stage::CountyRollup => "09_RawDataMonthWithCounty",
            Stage::DistrictRollup => "10_RawDataMonthWithDistrict",
            Stage::YearRollup => "11_RawDataYear",
            Stage::YearFiltered => "13_RawDataYearsCorrect",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_directories_are_unique() {
        for (i, a) in Stage::ALL.iter().enumerate() {
            for b in &Stage::ALL[i + 1..] {
                assert_ne!(a.dir_name(), b.dir_name());
            }
        }
    }
}
