//! Numeric encoding of joined rows.
//!
//! Column order is fixed:
//!
//! ```text
//! HourOfDay, Year, Month, DayOfMonth, DayOfWeek, ExchRate,
//! Holiday_bc_<name>..., Holiday_wa_<name>...
//! ```
//!
//! Holiday names are sorted per region. The vocabulary is built from every
//! joined row before the temporal split, so names that only occur in the test
//! window still get a column.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{HolidayRegion, JoinedRow};
use crate::error::PipelineError;

/// Non-holiday feature columns, in matrix order.
pub const BASE_FEATURES: [&str; 6] = ["HourOfDay", "Year", "Month", "DayOfMonth", "DayOfWeek", "ExchRate"];

/// Closed set of holiday names per region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayVocabulary {
    pub bc: Vec<String>,
    pub wa: Vec<String>,
}

impl HolidayVocabulary {
    pub fn from_rows(rows: &[JoinedRow]) -> Self {
        let collect = |region: HolidayRegion| -> Vec<String> {
            rows.iter()
                .filter_map(|r| r.holiday(region))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        Self {
            bc: collect(HolidayRegion::Bc),
            wa: collect(HolidayRegion::Wa),
        }
    }

    pub fn names(&self, region: HolidayRegion) -> &[String] {
        match region {
            HolidayRegion::Bc => &self.bc,
            HolidayRegion::Wa => &self.wa,
        }
    }

    pub fn index_of(&self, region: HolidayRegion, name: &str) -> Option<usize> {
        self.names(region).binary_search_by(|n| n.as_str().cmp(name)).ok()
    }
}

/// Feature column names plus the vocabulary that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub names: Vec<String>,
    pub vocabulary: HolidayVocabulary,
}

impl FeatureSchema {
    pub fn new(vocabulary: HolidayVocabulary) -> Self {
        let mut names: Vec<String> = BASE_FEATURES.iter().map(|s| s.to_string()).collect();
        for region in HolidayRegion::ALL {
            for name in vocabulary.names(region) {
                names.push(format!("{}_{}", region.column_prefix(), name));
            }
        }
        Self { names, vocabulary }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of the first indicator column of `region`.
    pub fn region_offset(&self, region: HolidayRegion) -> usize {
        match region {
            HolidayRegion::Bc => BASE_FEATURES.len(),
            HolidayRegion::Wa => BASE_FEATURES.len() + self.vocabulary.bc.len(),
        }
    }

    /// Encode one row. Fails if the row carries a holiday outside the vocabulary.
    pub fn encode(&self, row: &JoinedRow) -> Result<Vec<f64>, PipelineError> {
        let mut out = vec![0.0; self.len()];
        let c = &row.calendar;
        out[0] = row.hour_of_day as f64;
        out[1] = c.year as f64;
        out[2] = c.month as f64;
        out[3] = c.day_of_month as f64;
        out[4] = c.day_of_week as f64;
        out[5] = row.exch_rate;

        for region in HolidayRegion::ALL {
            let Some(name) = row.holiday(region) else {
                continue;
            };
            let idx = self.vocabulary.index_of(region, name).ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "holiday '{name}' ({}) on {} is outside the feature vocabulary",
                    region.display_name(),
                    row.date
                ))
            })?;
            out[self.region_offset(region) + idx] = 1.0;
        }

        Ok(out)
    }
}

/// A joined row with its feature vector. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub row: JoinedRow,
    pub features: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub schema: FeatureSchema,
    pub rows: Vec<EncodedRow>,
}

/// Build the vocabulary over all rows and encode every row.
pub fn build_feature_table(rows: Vec<JoinedRow>) -> Result<FeatureTable, PipelineError> {
    let vocabulary = HolidayVocabulary::from_rows(&rows);
    let schema = FeatureSchema::new(vocabulary);

    let rows = rows
        .into_iter()
        .map(|row| {
            let features = schema.encode(&row)?;
            Ok(EncodedRow { row, features })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    log::info!(
        "Built {} feature columns ({} BC holidays, {} WA holidays) over {} rows",
        schema.len(),
        schema.vocabulary.bc.len(),
        schema.vocabulary.wa.len(),
        rows.len()
    );

    Ok(FeatureTable { schema, rows })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::CalendarFeatures;

    fn row(day: u32, hour: u32, bc: Option<&str>, wa: Option<&str>) -> JoinedRow {
        let date = NaiveDate::from_ymd_opt(2018, 7, day).unwrap();
        JoinedRow {
            date_time: date.and_hms_opt(hour, 0, 0).unwrap(),
            date,
            hour_of_day: hour,
            delay: 7.0,
            calendar: CalendarFeatures::from_date(date),
            exch_rate: 1.31,
            holiday_bc: bc.map(str::to_string),
            holiday_wa: wa.map(str::to_string),
        }
    }

    #[test]
    fn columns_follow_fixed_order_with_sorted_vocabulary() {
        let rows = vec![
            row(1, 0, Some("Canada Day"), None),
            row(2, 0, Some("BC Day"), None),
            row(4, 0, None, Some("Independence Day")),
        ];
        let table = build_feature_table(rows).unwrap();
        assert_eq!(
            table.schema.names,
            vec![
                "HourOfDay",
                "Year",
                "Month",
                "DayOfMonth",
                "DayOfWeek",
                "ExchRate",
                "Holiday_bc_BC Day",
                "Holiday_bc_Canada Day",
                "Holiday_wa_Independence Day",
            ]
        );
        // 2018-07-01 was a Sunday.
        assert_eq!(table.rows[0].features, vec![0.0, 2018.0, 7.0, 1.0, 6.0, 1.31, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn at_most_one_indicator_per_region() {
        let rows = vec![
            row(1, 0, Some("Canada Day"), Some("Canada Day")),
            row(2, 3, Some("BC Day"), None),
            row(3, 5, None, None),
            row(4, 9, None, Some("Independence Day")),
        ];
        let table = build_feature_table(rows).unwrap();
        let schema = &table.schema;
        for enc in &table.rows {
            for region in HolidayRegion::ALL {
                let start = schema.region_offset(region);
                let width = schema.vocabulary.names(region).len();
                let set: f64 = enc.features[start..start + width].iter().sum();
                assert!(set <= 1.0);
                assert_eq!(set == 1.0, enc.row.holiday(region).is_some());
            }
        }
        // Same name in both regions lands in two independent columns.
        assert!(schema.names.contains(&"Holiday_bc_Canada Day".to_string()));
        assert!(schema.names.contains(&"Holiday_wa_Canada Day".to_string()));
    }

    #[test]
    fn unknown_holiday_is_rejected() {
        let schema = FeatureSchema::new(HolidayVocabulary::default());
        let err = schema.encode(&row(1, 0, Some("Canada Day"), None)).unwrap_err();
        assert!(err.to_string().contains("outside the feature vocabulary"));
    }
}
