//! Collapse raw wait-time observations into one record per (date, hour).

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{WaitTimeObservation, WaitTimeRecord};

#[derive(Debug)]
struct HourBucket {
    first: NaiveDateTime,
    sum: f64,
    count: usize,
}

/// Average delays per (date, hour).
///
/// The representative timestamp is the first observation of the hour in input
/// order. Output is sorted by (date, hour).
pub fn aggregate_hourly(observations: &[WaitTimeObservation]) -> Vec<WaitTimeRecord> {
    let mut buckets: BTreeMap<(NaiveDate, u32), HourBucket> = BTreeMap::new();

    for obs in observations {
        buckets
            .entry((obs.date(), obs.hour_of_day()))
            .and_modify(|b| {
                b.sum += obs.delay;
                b.count += 1;
            })
            .or_insert(HourBucket {
                first: obs.date_time,
                sum: obs.delay,
                count: 1,
            });
    }

    buckets
        .into_iter()
        .map(|((date, hour_of_day), b)| WaitTimeRecord {
            date_time: b.first,
            date,
            hour_of_day,
            delay: b.sum / b.count as f64,
        })
        .collect()
}
