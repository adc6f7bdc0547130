//! Exchange-rate lookup with forward/backward fill.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::ExchangeRateRecord;
use crate::error::PipelineError;

/// Daily exchange-rate series indexed by date, holding only usable values.
#[derive(Debug, Clone)]
pub struct FilledRates {
    values: BTreeMap<NaiveDate, f64>,
}

impl FilledRates {
    /// Index the usable values of `records`.
    ///
    /// If a date repeats, the last usable value wins.
    pub fn new(records: &[ExchangeRateRecord]) -> Self {
        let values = records
            .iter()
            .filter_map(|r| r.rate.map(|v| (r.date, v)))
            .collect();
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rate for `date`: the value on that day, else the most recent earlier
    /// value, else (leading gap) the nearest later value.
    pub fn rate_on(&self, date: NaiveDate) -> Option<f64> {
        self.values
            .range(..=date)
            .next_back()
            .or_else(|| self.values.range(date..).next())
            .map(|(_, v)| *v)
    }

    /// Like [`rate_on`](Self::rate_on), failing with `JoinCoverage`.
    pub fn require(&self, date: NaiveDate) -> Result<f64, PipelineError> {
        self.rate_on(date).ok_or(PipelineError::JoinCoverage { date })
    }
}
