//! Calendar join engine.
//!
//! Merges the three heterogeneous sources onto one per-hour timeline keyed by
//! (date, hour):
//!
//! - wait times: sub-hour observations averaged per hour (`aggregate`)
//! - exchange rate: daily, left-joined on date with forward/backward fill
//!   (`exchange`)
//! - holidays: two sparse calendars, canonicalized and left-joined on date
//!   independently (`holiday`)

pub mod aggregate;
pub mod exchange;
pub mod holiday;

pub use aggregate::*;
pub use exchange::*;
pub use holiday::*;

use crate::domain::{
    CalendarFeatures, ExchangeRateRecord, HolidayCalendar, HolidayRegion, JoinedRow, WaitTimeObservation,
};
use crate::error::PipelineError;

/// Counters describing what the join did (for the run summary).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub observations: usize,
    pub rows: usize,
    /// Rows whose date had no usable exchange rate of its own.
    pub rate_filled: usize,
    pub holiday_rows_bc: usize,
    pub holiday_rows_wa: usize,
}

#[derive(Debug, Clone)]
pub struct JoinedTable {
    pub rows: Vec<JoinedRow>,
    pub stats: JoinStats,
}

/// Join all sources into one row per (date, hour), ordered chronologically.
pub fn join_sources(
    observations: &[WaitTimeObservation],
    exchange_rates: &[ExchangeRateRecord],
    holidays_bc: &HolidayCalendar,
    holidays_wa: &HolidayCalendar,
) -> Result<JoinedTable, PipelineError> {
    if holidays_bc.region != HolidayRegion::Bc || holidays_wa.region != HolidayRegion::Wa {
        return Err(PipelineError::InvalidConfig(
            "holiday calendars passed in the wrong order (expected BC, then WA)".to_string(),
        ));
    }

    let hourly = aggregate_hourly(observations);
    let rates = FilledRates::new(exchange_rates);
    let own_rate_dates: std::collections::HashSet<_> = exchange_rates
        .iter()
        .filter(|r| r.rate.is_some())
        .map(|r| r.date)
        .collect();
    let bc = HolidayIndex::new(holidays_bc);
    let wa = HolidayIndex::new(holidays_wa);

    let mut stats = JoinStats {
        observations: observations.len(),
        ..JoinStats::default()
    };
    let mut rows = Vec::with_capacity(hourly.len());

    for record in hourly {
        let exch_rate = rates.require(record.date)?;
        if !own_rate_dates.contains(&record.date) {
            stats.rate_filled += 1;
        }

        let holiday_bc = bc.lookup(record.date).map(str::to_string);
        let holiday_wa = wa.lookup(record.date).map(str::to_string);
        stats.holiday_rows_bc += usize::from(holiday_bc.is_some());
        stats.holiday_rows_wa += usize::from(holiday_wa.is_some());

        rows.push(JoinedRow {
            date_time: record.date_time,
            date: record.date,
            hour_of_day: record.hour_of_day,
            delay: record.delay,
            calendar: CalendarFeatures::from_date(record.date),
            exch_rate,
            holiday_bc,
            holiday_wa,
        });
    }

    stats.rows = rows.len();
    log::info!(
        "Joined {} observations into {} hourly rows ({} with filled exchange rate)",
        stats.observations,
        stats.rows,
        stats.rate_filled
    );

    Ok(JoinedTable { rows, stats })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::*;
    use crate::domain::HolidayRecord;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, day).unwrap()
    }

    fn hourly_obs(first: NaiveDate, days: i64, delay: f64) -> Vec<WaitTimeObservation> {
        let start: NaiveDateTime = first.and_hms_opt(0, 0, 0).unwrap();
        (0..days * 24)
            .map(|h| WaitTimeObservation {
                date_time: start + Duration::hours(h),
                delay,
            })
            .collect()
    }

    fn empty(region: HolidayRegion) -> HolidayCalendar {
        HolidayCalendar {
            region,
            records: vec![],
        }
    }

    #[test]
    fn one_row_per_hour_and_rate_never_missing() {
        let mut obs = hourly_obs(d(1), 3, 5.0);
        // A second observation in an already observed hour must not add a row.
        obs.push(WaitTimeObservation {
            date_time: d(2).and_hms_opt(6, 30, 0).unwrap(),
            delay: 15.0,
        });
        let rates = vec![
            ExchangeRateRecord { date: d(1), rate: None },
            ExchangeRateRecord { date: d(2), rate: Some(1.30) },
        ];

        let table = join_sources(&obs, &rates, &empty(HolidayRegion::Bc), &empty(HolidayRegion::Wa)).unwrap();

        assert_eq!(table.rows.len(), 72);
        let keys: HashSet<_> = table.rows.iter().map(|r| (r.date, r.hour_of_day)).collect();
        assert_eq!(keys.len(), 72);
        assert!(table.rows.iter().all(|r| r.exch_rate.is_finite()));
        // Leading gap (day 1) back-filled, trailing day 3 forward-filled.
        assert!(table.rows.iter().all(|r| r.exch_rate == 1.30));
        assert_eq!(table.stats.rate_filled, 48);

        let merged = table.rows.iter().find(|r| r.date == d(2) && r.hour_of_day == 6).unwrap();
        assert_eq!(merged.delay, 10.0);
    }

    #[test]
    fn rows_are_chronological() {
        let mut obs = hourly_obs(d(1), 2, 1.0);
        obs.reverse();
        let rates = vec![ExchangeRateRecord { date: d(1), rate: Some(1.0) }];
        let table = join_sources(&obs, &rates, &empty(HolidayRegion::Bc), &empty(HolidayRegion::Wa)).unwrap();
        assert!(
            table
                .rows
                .windows(2)
                .all(|w| (w[0].date, w[0].hour_of_day) < (w[1].date, w[1].hour_of_day))
        );
    }

    #[test]
    fn holidays_join_independently_per_region() {
        let obs = hourly_obs(d(1), 5, 1.0);
        let rates = vec![ExchangeRateRecord { date: d(1), rate: Some(1.0) }];
        let bc = HolidayCalendar {
            region: HolidayRegion::Bc,
            records: vec![HolidayRecord {
                date: d(2),
                name: Some("Canada Day (observed)".to_string()),
            }],
        };
        let wa = HolidayCalendar {
            region: HolidayRegion::Wa,
            records: vec![HolidayRecord {
                date: d(4),
                name: Some("Independence Day".to_string()),
            }],
        };

        let table = join_sources(&obs, &rates, &bc, &wa).unwrap();

        let day2 = table.rows.iter().find(|r| r.date == d(2)).unwrap();
        assert_eq!(day2.holiday_bc.as_deref(), Some("Canada Day"));
        assert_eq!(day2.holiday_wa, None);
        let day4 = table.rows.iter().find(|r| r.date == d(4)).unwrap();
        assert_eq!(day4.holiday_wa.as_deref(), Some("Independence Day"));
        assert_eq!(table.stats.holiday_rows_bc, 24);
        assert_eq!(table.stats.holiday_rows_wa, 24);
    }

    #[test]
    fn all_missing_exchange_series_fails_fast() {
        let obs = hourly_obs(d(1), 1, 1.0);
        let rates = vec![ExchangeRateRecord { date: d(1), rate: None }];
        let err = join_sources(&obs, &rates, &empty(HolidayRegion::Bc), &empty(HolidayRegion::Wa)).unwrap_err();
        assert!(matches!(err, PipelineError::JoinCoverage { .. }));
    }
}
