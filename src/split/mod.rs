//! Temporal train/test split.
//!
//! Rows are partitioned by date only, never shuffled:
//!
//! - train: `date < test_start`
//! - test: `test_start <= date <= test_end`
//! - anything after `test_end` belongs to neither side
//!
//! Partitions borrow rows from the feature table; nothing is copied or mutated
//! until a design matrix is requested.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};

use crate::error::{PipelineError, SplitSide};
use crate::features::{BASE_FEATURES, EncodedRow, FeatureSchema, FeatureTable};

/// One side of the split, in chronological order.
#[derive(Debug, Clone)]
pub struct Partition<'a> {
    pub rows: Vec<&'a EncodedRow>,
    n_features: usize,
}

impl<'a> Partition<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature matrix (rows × features). Delay, timestamp and date are not
    /// part of it.
    pub fn features(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.rows.len(), self.n_features, |i, j| self.rows[i].features[j])
    }

    /// Delay label vector aligned with [`features`](Self::features).
    pub fn labels(&self) -> DVector<f64> {
        DVector::from_iterator(self.rows.len(), self.rows.iter().map(|r| r.row.delay))
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.rows.first()?.row.date, self.rows.last()?.row.date))
    }
}

#[derive(Debug, Clone)]
pub struct TemporalSplit<'a> {
    pub train: Partition<'a>,
    pub test: Partition<'a>,
    /// Rows dated after `test_end`.
    pub dropped: usize,
}

/// Owned description of a split for reports.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub dropped: usize,
    pub train_range: Option<(NaiveDate, NaiveDate)>,
    pub test_range: Option<(NaiveDate, NaiveDate)>,
    /// Holiday indicator columns set in the test partition but never in train.
    /// These exist only because the vocabulary spans both partitions.
    pub test_only_holidays: Vec<String>,
}

impl TemporalSplit<'_> {
    pub fn summary(&self, schema: &FeatureSchema) -> SplitSummary {
        let used = |part: &Partition<'_>| -> BTreeSet<usize> {
            part.rows
                .iter()
                .flat_map(|r| {
                    r.features
                        .iter()
                        .enumerate()
                        .skip(BASE_FEATURES.len())
                        .filter(|(_, v)| **v != 0.0)
                        .map(|(j, _)| j)
                })
                .collect()
        };
        let in_train = used(&self.train);
        let test_only_holidays = used(&self.test)
            .difference(&in_train)
            .filter_map(|&j| schema.names.get(j).cloned())
            .collect();

        SplitSummary {
            train_rows: self.train.len(),
            test_rows: self.test.len(),
            dropped: self.dropped,
            train_range: self.train.date_range(),
            test_range: self.test.date_range(),
            test_only_holidays,
        }
    }
}

/// Split `table` around the test window `[test_start, test_end]`.
pub fn split_by_date(
    table: &FeatureTable,
    test_start: NaiveDate,
    test_end: NaiveDate,
) -> Result<TemporalSplit<'_>, PipelineError> {
    if test_start > test_end {
        return Err(PipelineError::InvalidConfig(format!(
            "test window start {test_start} is after its end {test_end}"
        )));
    }

    let n_features = table.schema.len();
    let mut train = Vec::new();
    let mut test = Vec::new();
    let mut dropped = 0usize;

    for enc in &table.rows {
        let date = enc.row.date;
        if date < test_start {
            train.push(enc);
        } else if date <= test_end {
            test.push(enc);
        } else {
            dropped += 1;
        }
    }

    for (side, rows) in [(SplitSide::Train, &train), (SplitSide::Test, &test)] {
        if rows.is_empty() {
            return Err(PipelineError::EmptySplit {
                side,
                test_start,
                test_end,
            });
        }
    }

    if dropped > 0 {
        log::debug!("{dropped} rows after {test_end} excluded from both partitions");
    }
    log::info!("Split: {} train rows, {} test rows", train.len(), test.len());

    Ok(TemporalSplit {
        train: Partition { rows: train, n_features },
        test: Partition { rows: test, n_features },
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{CalendarFeatures, JoinedRow};
    use crate::features::build_feature_table;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 8, 20).unwrap() + Duration::days(n)
    }

    fn table(days: i64) -> FeatureTable {
        let rows = (0..days)
            .flat_map(|n| {
                (0..24).map(move |h| JoinedRow {
                    date_time: day(n).and_hms_opt(h, 0, 0).unwrap(),
                    date: day(n),
                    hour_of_day: h,
                    delay: (n * 24 + h as i64) as f64,
                    calendar: CalendarFeatures::from_date(day(n)),
                    exch_rate: 1.3,
                    holiday_bc: None,
                    holiday_wa: None,
                })
            })
            .collect();
        build_feature_table(rows).unwrap()
    }

    #[test]
    fn partitions_are_disjoint_and_respect_the_window() {
        let t = table(10);
        let split = split_by_date(&t, day(5), day(7)).unwrap();

        assert_eq!(split.train.len(), 5 * 24);
        assert_eq!(split.test.len(), 3 * 24);
        assert_eq!(split.dropped, 2 * 24);
        assert!(split.train.rows.iter().all(|r| r.row.date < day(5)));
        assert!(split.test.rows.iter().all(|r| day(5) <= r.row.date && r.row.date <= day(7)));

        let train_keys: std::collections::HashSet<_> =
            split.train.rows.iter().map(|r| (r.row.date, r.row.hour_of_day)).collect();
        assert!(split.test.rows.iter().all(|r| !train_keys.contains(&(r.row.date, r.row.hour_of_day))));
    }

    #[test]
    fn matrices_keep_chronological_order_and_exclude_label() {
        let t = table(3);
        let split = split_by_date(&t, day(2), day(2)).unwrap();
        let x = split.test.features();
        let y = split.test.labels();

        assert_eq!(x.nrows(), 24);
        assert_eq!(x.ncols(), t.schema.len());
        assert_eq!(x[(0, 0)], 0.0);
        assert_eq!(x[(23, 0)], 23.0);
        assert_eq!(y[0], 48.0);
        assert_eq!(y[23], 71.0);
        assert_eq!(split.test.date_range(), Some((day(2), day(2))));
    }

    #[test]
    fn summary_flags_holidays_seen_only_in_test() {
        let mut rows: Vec<JoinedRow> = table(3).rows.into_iter().map(|e| e.row).collect();
        for r in rows.iter_mut().filter(|r| r.date == day(2)) {
            r.holiday_wa = Some("Labor Day".to_string());
        }
        let t = build_feature_table(rows).unwrap();
        let split = split_by_date(&t, day(2), day(2)).unwrap();
        let summary = split.summary(&t.schema);

        assert_eq!(summary.train_rows, 48);
        assert_eq!(summary.test_rows, 24);
        assert_eq!(summary.test_range, Some((day(2), day(2))));
        assert_eq!(summary.test_only_holidays, vec!["Holiday_wa_Labor Day".to_string()]);
    }

    #[test]
    fn empty_sides_are_errors() {
        let t = table(3);
        let err = split_by_date(&t, day(0), day(1)).unwrap_err();
        assert!(matches!(err, PipelineError::EmptySplit { side: SplitSide::Train, .. }));

        let err = split_by_date(&t, day(5), day(6)).unwrap_err();
        assert!(matches!(err, PipelineError::EmptySplit { side: SplitSide::Test, .. }));

        let err = split_by_date(&t, day(2), day(1)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }
}
