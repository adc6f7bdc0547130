//! Aggregations over the joined table used by the terminal report.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::JoinedRow;
use crate::features::EncodedRow;
use crate::math::{mae, mean, rmse};

/// Calendar dimension a delay profile is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileDimension {
    Year,
    Month,
    DayOfWeek,
    HourOfDay,
}

impl ProfileDimension {
    pub const ALL: [ProfileDimension; 4] = [
        ProfileDimension::Year,
        ProfileDimension::Month,
        ProfileDimension::DayOfWeek,
        ProfileDimension::HourOfDay,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProfileDimension::Year => "Year",
            ProfileDimension::Month => "Month",
            ProfileDimension::DayOfWeek => "DayOfWeek",
            ProfileDimension::HourOfDay => "HourOfDay",
        }
    }

    fn key(self, row: &JoinedRow) -> i64 {
        match self {
            ProfileDimension::Year => row.calendar.year as i64,
            ProfileDimension::Month => row.calendar.month as i64,
            ProfileDimension::DayOfWeek => row.calendar.day_of_week as i64,
            ProfileDimension::HourOfDay => row.hour_of_day as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    pub key: i64,
    pub mean_delay: f64,
    pub rows: usize,
}

/// Mean delay per value of one calendar dimension, ascending by key.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayProfile {
    pub dimension: ProfileDimension,
    pub points: Vec<ProfilePoint>,
}

pub fn delay_profile<'a>(rows: impl IntoIterator<Item = &'a JoinedRow>, dimension: ProfileDimension) -> DelayProfile {
    let mut groups: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(dimension.key(row)).or_insert((0.0, 0));
        entry.0 += row.delay;
        entry.1 += 1;
    }
    DelayProfile {
        dimension,
        points: groups
            .into_iter()
            .map(|(key, (sum, n))| ProfilePoint {
                key,
                mean_delay: sum / n as f64,
                rows: n,
            })
            .collect(),
    }
}

pub fn delay_profiles<'a, I>(rows: I) -> Vec<DelayProfile>
where
    I: IntoIterator<Item = &'a JoinedRow> + Clone,
{
    ProfileDimension::ALL
        .iter()
        .map(|&d| delay_profile(rows.clone(), d))
        .collect()
}

/// Yearly mean delay alongside the yearly mean exchange rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearlyRate {
    pub year: i32,
    pub mean_delay: f64,
    pub mean_rate: f64,
}

pub fn yearly_delay_vs_rate<'a>(rows: impl IntoIterator<Item = &'a JoinedRow>) -> Vec<YearlyRate> {
    let mut groups: BTreeMap<i32, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(row.calendar.year).or_default();
        entry.0.push(row.delay);
        entry.1.push(row.exch_rate);
    }
    groups
        .into_iter()
        .filter_map(|(year, (delays, rates))| {
            Some(YearlyRate {
                year,
                mean_delay: mean(&delays)?,
                mean_rate: mean(&rates)?,
            })
        })
        .collect()
}

/// Actual vs predicted delay for one test day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayComparison {
    pub date: NaiveDate,
    /// `(hour, actual, predicted)` in hour order.
    pub hours: Vec<(u32, f64, f64)>,
}

/// Group aligned test rows and predictions by date.
pub fn daily_comparisons(test: &[EncodedRow], predictions: &[f64]) -> Vec<DayComparison> {
    let mut days: BTreeMap<NaiveDate, Vec<(u32, f64, f64)>> = BTreeMap::new();
    for (enc, &pred) in test.iter().zip(predictions) {
        days.entry(enc.row.date)
            .or_default()
            .push((enc.row.hour_of_day, enc.row.delay, pred));
    }
    days.into_iter()
        .map(|(date, mut hours)| {
            hours.sort_by_key(|h| h.0);
            DayComparison { date, hours }
        })
        .collect()
}

/// Error metrics of the kept model on the test window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestMetrics {
    pub rows: usize,
    pub rmse: f64,
    pub mae: f64,
    pub mean_actual: f64,
    pub mean_predicted: f64,
}

impl TestMetrics {
    pub fn new(actual: &[f64], predicted: &[f64]) -> Self {
        Self {
            rows: actual.len(),
            rmse: rmse(predicted, actual),
            mae: mae(predicted, actual),
            mean_actual: mean(actual).unwrap_or(f64::NAN),
            mean_predicted: mean(predicted).unwrap_or(f64::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CalendarFeatures;

    fn row(date: NaiveDate, hour: u32, delay: f64, rate: f64) -> JoinedRow {
        JoinedRow {
            date_time: date.and_hms_opt(hour, 0, 0).unwrap(),
            date,
            hour_of_day: hour,
            delay,
            calendar: CalendarFeatures::from_date(date),
            exch_rate: rate,
            holiday_bc: None,
            holiday_wa: None,
        }
    }

    #[test]
    fn hour_profile_means_per_hour() {
        let d1 = NaiveDate::from_ymd_opt(2017, 12, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let rows = vec![row(d1, 8, 10.0, 1.2), row(d2, 8, 30.0, 1.3), row(d2, 9, 5.0, 1.3)];

        let p = delay_profile(&rows, ProfileDimension::HourOfDay);
        assert_eq!(
            p.points,
            vec![
                ProfilePoint {
                    key: 8,
                    mean_delay: 20.0,
                    rows: 2
                },
                ProfilePoint {
                    key: 9,
                    mean_delay: 5.0,
                    rows: 1
                },
            ]
        );

        let yearly = yearly_delay_vs_rate(&rows);
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[0].year, 2017);
        assert!((yearly[1].mean_delay - 17.5).abs() < 1e-12);
        assert!((yearly[1].mean_rate - 1.3).abs() < 1e-12);

        // Sunday = 6, Monday = 0.
        let dow = delay_profile(&rows, ProfileDimension::DayOfWeek);
        assert_eq!(dow.points.iter().map(|p| p.key).collect::<Vec<_>>(), vec![0, 6]);
    }

    #[test]
    fn comparisons_group_by_day() {
        let d1 = NaiveDate::from_ymd_opt(2018, 8, 25).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2018, 8, 26).unwrap();
        let test: Vec<EncodedRow> = [row(d1, 0, 1.0, 1.3), row(d1, 1, 2.0, 1.3), row(d2, 0, 3.0, 1.3)]
            .into_iter()
            .map(|r| EncodedRow {
                row: r,
                features: vec![],
            })
            .collect();

        let days = daily_comparisons(&test, &[1.5, 2.5, 3.5]);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].hours, vec![(0, 1.0, 1.5), (1, 2.0, 2.5)]);
        assert_eq!(days[1].date, d2);

        let m = TestMetrics::new(&[1.0, 2.0, 3.0], &[1.5, 2.5, 3.5]);
        assert!((m.rmse - 0.5).abs() < 1e-12);
        assert!((m.mae - 0.5).abs() < 1e-12);
    }
}
