//! Shared domain types.
//!
//! Source records are what the ingest layer hands to the join engine; a
//! [`JoinedRow`] is the unit entity of the pipeline after the join.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::boost::BoosterParams;

/// One raw (possibly sub-hour) wait-time observation.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitTimeObservation {
    pub date_time: NaiveDateTime,
    /// Average delay in minutes. Missing values are already mapped to 0.
    pub delay: f64,
}

impl WaitTimeObservation {
    pub fn date(&self) -> NaiveDate {
        self.date_time.date()
    }

    pub fn hour_of_day(&self) -> u32 {
        self.date_time.hour()
    }
}

/// One wait-time record per observed (date, hour).
#[derive(Debug, Clone, PartialEq)]
pub struct WaitTimeRecord {
    /// Timestamp of the first raw observation in this hour.
    pub date_time: NaiveDateTime,
    pub date: NaiveDate,
    pub hour_of_day: u32,
    pub delay: f64,
}

/// Daily exchange rate. `rate` is `None` for gaps and placeholders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRateRecord {
    pub date: NaiveDate,
    pub rate: Option<f64>,
}

/// The two independent holiday calendars on either side of the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayRegion {
    /// British Columbia (northern side).
    Bc,
    /// Washington State (southern side).
    Wa,
}

impl HolidayRegion {
    pub const ALL: [HolidayRegion; 2] = [HolidayRegion::Bc, HolidayRegion::Wa];

    /// Prefix of the one-hot indicator columns for this region.
    pub fn column_prefix(self) -> &'static str {
        match self {
            HolidayRegion::Bc => "Holiday_bc",
            HolidayRegion::Wa => "Holiday_wa",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HolidayRegion::Bc => "British Columbia",
            HolidayRegion::Wa => "Washington",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HolidayRecord {
    pub date: NaiveDate,
    /// `None` means the date is explicitly a non-holiday.
    pub name: Option<String>,
}

/// A sparse holiday calendar for one region.
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    pub region: HolidayRegion,
    pub records: Vec<HolidayRecord>,
}

/// Calendar features derived from a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month: u32,
    pub day_of_month: u32,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u32,
}

/// One row per (date, hour) after joining all sources.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub date_time: NaiveDateTime,
    pub date: NaiveDate,
    pub hour_of_day: u32,
    pub delay: f64,
    pub calendar: CalendarFeatures,
    /// Gap-filled; never missing.
    pub exch_rate: f64,
    pub holiday_bc: Option<String>,
    pub holiday_wa: Option<String>,
}

impl JoinedRow {
    pub fn holiday(&self, region: HolidayRegion) -> Option<&str> {
        match region {
            HolidayRegion::Bc => self.holiday_bc.as_deref(),
            HolidayRegion::Wa => self.holiday_wa.as_deref(),
        }
    }
}

/// Input file locations.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub wait_times: PathBuf,
    pub exchange_rates: PathBuf,
    pub holidays_bc: PathBuf,
    pub holidays_wa: PathBuf,
}

/// Header names of the wait-time export.
#[derive(Debug, Clone)]
pub struct WaitTimeColumns {
    pub date_time: String,
    pub delay: String,
}

/// The historical window and the test window inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.begin <= date && date <= self.end
    }
}

/// Early-stopping schedule for the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoppingRule {
    /// Stop after this many consecutive rounds without eval improvement.
    pub patience: usize,
    /// Hard cap on boosting rounds.
    pub max_rounds: usize,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub paths: DataPaths,
    pub columns: WaitTimeColumns,
    pub window: DateWindow,
    pub booster: BoosterParams,
    pub stopping: StoppingRule,

    pub model_out: PathBuf,
    pub predictions_out: PathBuf,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub top_features: usize,
    pub debug: bool,
}
