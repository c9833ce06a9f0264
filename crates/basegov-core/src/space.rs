//! The combinatorial download space: every (month, district, municipality,
//! contract type) combination the portal is asked for.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::key::RawKey;

/// One district and the municipality ids filed under it. The three aggregate
/// districts (continental Portugal, undetermined, consulates abroad) carry a
/// single municipality id of 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictMunicipalities {
    pub district: u16,
    pub municipalities: Vec<u16>,
}

/// Declared parameter space for acquisition. Immutable configuration data,
/// constructed once and passed to the pipeline explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSpace {
    /// First day of the earliest month to cover.
    pub first_month: NaiveDate,
    /// Any date inside (or the last day of) the final month to cover.
    pub last_month: NaiveDate,
    pub districts: Vec<DistrictMunicipalities>,
    pub contract_types: Vec<u8>,
}

impl DownloadSpace {
    /// The portal's published id ranges: districts 2..=21 each own a
    /// contiguous municipality id range, districts 22..=24 are aggregates.
    pub fn builtin(first_month: NaiveDate, last_month: NaiveDate) -> Self {
        let ranges: [(u16, u16, u16); 20] = [
            (2, 3, 22),
            (3, 23, 37),
            (4, 38, 52),
            (5, 53, 65),
            (6, 66, 77),
            (7, 78, 95),
            (8, 96, 110),
            (9, 111, 127),
            (10, 128, 142),
            (11, 143, 159),
            (12, 160, 176),
            (13, 177, 192),
            (14, 193, 211),
            (15, 212, 233),
            (16, 234, 247),
            (17, 248, 258),
            (18, 259, 273),
            (19, 274, 298),
            (20, 299, 318),
            (21, 319, 330),
        ];
        let mut districts: Vec<DistrictMunicipalities> = ranges
            .iter()
            .map(|&(district, lo, hi)| DistrictMunicipalities {
                district,
                municipalities: (lo..hi).collect(),
            })
            .collect();
        for district in [22, 23, 24] {
            districts.push(DistrictMunicipalities {
                district,
                municipalities: vec![0],
            });
        }
        Self {
            first_month,
            last_month,
            districts,
            contract_types: (1..=23).collect(),
        }
    }

    /// Load an override space from YAML (same shape as the serde model).
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn is_aggregate_district(&self, district: u16) -> bool {
        self.districts
            .iter()
            .any(|d| d.district == district && d.municipalities == [0])
    }

    /// Half-open month ranges `[start, next_month_start)` covering the
    /// configured bounds. Reproduces the archive's generator: step 31 days,
    /// clamp to the first of the month.
    pub fn monthly_ranges(&self) -> Vec<(NaiveDate, NaiveDate)> {
        monthly_ranges(self.first_month, self.last_month)
    }

    /// Every key in the space, in month, district, municipality, type order.
    pub fn keys(&self) -> impl Iterator<Item = RawKey> + '_ {
        self.monthly_ranges()
            .into_iter()
            .flat_map(move |(start, end)| {
                self.districts.iter().flat_map(move |d| {
                    d.municipalities.iter().flat_map(move |&municipality| {
                        self.contract_types.iter().map(move |&contract_type| RawKey {
                            start,
                            end,
                            district: d.district,
                            municipality,
                            contract_type,
                        })
                    })
                })
            })
    }

    /// Number of keys in the space.
    pub fn len(&self) -> usize {
        let combos: usize = self
            .districts
            .iter()
            .map(|d| d.municipalities.len())
            .sum::<usize>()
            * self.contract_types.len();
        self.monthly_ranges().len() * combos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn monthly_ranges(first: NaiveDate, last: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut ranges = Vec::new();
    let mut cur = first;
    while cur <= last {
        let next = (cur + Duration::days(31))
            .with_day(1)
            .expect("day 1 is valid in every month");
        ranges.push((cur, next));
        cur = next;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_ranges_are_half_open_and_contiguous() {
        let space = DownloadSpace::builtin(date(2015, 1, 1), date(2015, 12, 31));
        let ranges = space.monthly_ranges();
        assert_eq!(ranges.len(), 12);
        assert_eq!(ranges[0], (date(2015, 1, 1), date(2015, 2, 1)));
        assert_eq!(ranges[11], (date(2015, 12, 1), date(2016, 1, 1)));
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn builtin_space_has_the_published_shape() {
        let space = DownloadSpace::builtin(date(2015, 1, 1), date(2015, 1, 31));
        assert_eq!(space.districts.len(), 23);
        assert_eq!(space.contract_types.len(), 23);
        let total_municipalities: usize =
            space.districts.iter().map(|d| d.municipalities.len()).sum();
        // 308 real municipalities plus three aggregate placeholders.
        assert_eq!(total_municipalities, 311);
        assert!(space.is_aggregate_district(22));
        assert!(!space.is_aggregate_district(14));
    }

    #[test]
    fn keys_enumerate_the_full_product() {
        let space = DownloadSpace {
            first_month: date(2020, 1, 1),
            last_month: date(2020, 2, 28),
            districts: vec![
                DistrictMunicipalities {
                    district: 2,
                    municipalities: vec![3, 4],
                },
                DistrictMunicipalities {
                    district: 22,
                    municipalities: vec![0],
                },
            ],
            contract_types: vec![1, 2],
        };
        let keys: Vec<_> = space.keys().collect();
        assert_eq!(keys.len(), 2 * 3 * 2);
        assert_eq!(keys.len(), space.len());
        assert_eq!(
            keys[0],
            RawKey {
                start: date(2020, 1, 1),
                end: date(2020, 2, 1),
                district: 2,
                municipality: 3,
                contract_type: 1,
            }
        );
    }

    #[test]
    fn yaml_round_trip() {
        let space = DownloadSpace::builtin(date(2015, 1, 1), date(2015, 3, 31));
        let text = serde_yaml::to_string(&space).unwrap();
        assert_eq!(DownloadSpace::from_yaml_str(&text).unwrap(), space);
    }
}
