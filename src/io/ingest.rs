//! CSV ingest and validation.
//!
//! This module turns the four flat source tables into typed records:
//!
//! - wait-time export (timestamp + average delay)
//! - daily exchange rates (FRED style, `.` for unavailable)
//! - two holiday calendars (`Date`, `Holiday`, ...)
//!
//! Design goals:
//! - **Strict schema**: a missing column or an unparsable date aborts the run
//!   with a `SourceFormat` error naming the file and line
//! - **Lenient values** where the data is known to be sparse: empty delays are
//!   0, placeholder exchange rates are missing
//! - **No joining here**: records come out in file order

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{
    DateWindow, ExchangeRateRecord, HolidayCalendar, HolidayRecord, HolidayRegion, WaitTimeColumns,
    WaitTimeObservation,
};
use crate::error::PipelineError;

/// Aliases accepted when the configured wait-time headers are absent.
const DATE_TIME_ALIAS: &str = "date_time";
const DELAY_ALIAS: &str = "delay";

/// Holiday entries that are observances rather than statutory holidays.
const NON_STATUTORY: [&str; 2] = ["Mother's Day", "Father's Day"];

/// Wait-time ingest output: raw observations plus counters for the run summary.
#[derive(Debug, Clone)]
pub struct WaitTimeSource {
    pub observations: Vec<WaitTimeObservation>,
    pub rows_read: usize,
    /// Rows whose delay was empty or non-numeric (mapped to 0).
    pub missing_delay: usize,
    /// Rows dropped because they fall outside the configured window.
    pub outside_window: usize,
    /// Kept rows with a delay below zero.
    pub negative_delay: usize,
}

#[derive(Debug, Clone)]
pub struct ExchangeRateSource {
    pub records: Vec<ExchangeRateRecord>,
    /// Rows whose value was a placeholder or otherwise unusable.
    pub placeholders: usize,
}

/// Per-source counters reported after loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub wait_rows_read: usize,
    pub wait_observations: usize,
    pub wait_missing_delay: usize,
    pub wait_outside_window: usize,
    pub wait_negative_delay: usize,
    pub rate_rows: usize,
    pub rate_placeholders: usize,
    pub holidays_bc: usize,
    pub holidays_wa: usize,
}

impl IngestSummary {
    pub fn new(
        wait: &WaitTimeSource,
        rates: &ExchangeRateSource,
        bc: &HolidayCalendar,
        wa: &HolidayCalendar,
    ) -> Self {
        let named = |c: &HolidayCalendar| c.records.iter().filter(|r| r.name.is_some()).count();
        Self {
            wait_rows_read: wait.rows_read,
            wait_observations: wait.observations.len(),
            wait_missing_delay: wait.missing_delay,
            wait_outside_window: wait.outside_window,
            wait_negative_delay: wait.negative_delay,
            rate_rows: rates.records.len(),
            rate_placeholders: rates.placeholders,
            holidays_bc: named(bc),
            holidays_wa: named(wa),
        }
    }
}

/// Load the wait-time export, keeping only observations inside `window`.
pub fn load_wait_times(
    path: &Path,
    columns: &WaitTimeColumns,
    window: Option<&DateWindow>,
) -> Result<WaitTimeSource, PipelineError> {
    let file = open(path)?;
    read_wait_times(file, &path.display().to_string(), columns, window)
}

pub fn read_wait_times<R: Read>(
    reader: R,
    source_name: &str,
    columns: &WaitTimeColumns,
    window: Option<&DateWindow>,
) -> Result<WaitTimeSource, PipelineError> {
    let mut reader = csv_reader(reader, true);
    let headers = read_headers(&mut reader, source_name)?;
    let header_map = build_header_map(&headers);

    let ts_idx = resolve_column(&header_map, &columns.date_time, DATE_TIME_ALIAS)
        .ok_or_else(|| missing_column(source_name, &columns.date_time))?;
    let delay_idx = resolve_column(&header_map, &columns.delay, DELAY_ALIAS)
        .ok_or_else(|| missing_column(source_name, &columns.delay))?;

    let mut observations = Vec::new();
    let mut rows_read = 0usize;
    let mut missing_delay = 0usize;
    let mut outside_window = 0usize;
    let mut negative_delay = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;
        let record = result.map_err(|e| PipelineError::source_format(source_name, format!("line {line}: {e}")))?;

        let raw_ts = field(&record, ts_idx)
            .ok_or_else(|| PipelineError::source_format(source_name, format!("line {line}: empty timestamp")))?;
        let date_time = parse_date_time(raw_ts)
            .map_err(|e| PipelineError::source_format(source_name, format!("line {line}: {e}")))?;

        if let Some(window) = window {
            if !window.contains(date_time.date()) {
                outside_window += 1;
                continue;
            }
        }

        let delay = match parse_opt_f64(field(&record, delay_idx)) {
            Some(v) => v,
            None => {
                missing_delay += 1;
                0.0
            }
        };
        if delay < 0.0 {
            negative_delay += 1;
        }

        observations.push(WaitTimeObservation { date_time, delay });
    }

    if outside_window > 0 {
        log::debug!("{source_name}: dropped {outside_window} rows outside the configured date window");
    }

    if negative_delay > 0 {
        log::warn!("{source_name}: {negative_delay} rows have a negative delay; kept as recorded");
    }

    Ok(WaitTimeSource {
        observations,
        rows_read,
        missing_delay,
        outside_window,
        negative_delay,
    })
}

/// Load a daily exchange-rate table.
///
/// The first two columns are read positionally as (date, rate); the header row
/// is skipped whatever it is called (FRED exports `DATE,DEXCAUS`).
pub fn load_exchange_rates(path: &Path) -> Result<ExchangeRateSource, PipelineError> {
    let file = open(path)?;
    read_exchange_rates(file, &path.display().to_string())
}

pub fn read_exchange_rates<R: Read>(reader: R, source_name: &str) -> Result<ExchangeRateSource, PipelineError> {
    let mut reader = csv_reader(reader, true);
    let headers = read_headers(&mut reader, source_name)?;
    if headers.len() < 2 {
        return Err(PipelineError::source_format(
            source_name,
            "expected two columns (Date, ExchRate)",
        ));
    }

    let mut records = Vec::new();
    let mut placeholders = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| PipelineError::source_format(source_name, format!("line {line}: {e}")))?;

        let raw_date = field(&record, 0)
            .ok_or_else(|| PipelineError::source_format(source_name, format!("line {line}: empty date")))?;
        let date = parse_date(raw_date)
            .map_err(|e| PipelineError::source_format(source_name, format!("line {line}: {e}")))?;

        let rate = parse_rate(field(&record, 1));
        if rate.is_none() {
            placeholders += 1;
        }
        records.push(ExchangeRateRecord { date, rate });
    }

    if placeholders > 0 {
        log::debug!("{source_name}: {placeholders} placeholder/unusable exchange-rate values treated as missing");
    }

    Ok(ExchangeRateSource { records, placeholders })
}

/// Load a holiday calendar for one region.
pub fn load_holidays(path: &Path, region: HolidayRegion) -> Result<HolidayCalendar, PipelineError> {
    let file = open(path)?;
    read_holidays(file, &path.display().to_string(), region)
}

pub fn read_holidays<R: Read>(
    reader: R,
    source_name: &str,
    region: HolidayRegion,
) -> Result<HolidayCalendar, PipelineError> {
    let mut reader = csv_reader(reader, true);
    let headers = read_headers(&mut reader, source_name)?;
    let header_map = build_header_map(&headers);

    let date_idx = *header_map.get("date").ok_or_else(|| missing_column(source_name, "Date"))?;
    let name_idx = *header_map
        .get("holiday")
        .ok_or_else(|| missing_column(source_name, "Holiday"))?;

    let mut records: Vec<HolidayRecord> = Vec::new();
    let mut seen: HashMap<NaiveDate, usize> = HashMap::new();

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| PipelineError::source_format(source_name, format!("line {line}: {e}")))?;

        let raw_date = field(&record, date_idx)
            .ok_or_else(|| PipelineError::source_format(source_name, format!("line {line}: empty date")))?;
        let date = parse_date(raw_date)
            .map_err(|e| PipelineError::source_format(source_name, format!("line {line}: {e}")))?;

        let name = field(&record, name_idx).map(str::to_string);
        if name.as_deref().is_some_and(|n| NON_STATUTORY.contains(&n)) {
            continue;
        }

        if let Some(&first_line) = seen.get(&date) {
            log::warn!(
                "{source_name}: line {line} repeats {date} (first seen on line {first_line}); keeping the first entry"
            );
            continue;
        }
        seen.insert(date, line);
        records.push(HolidayRecord { date, name });
    }

    Ok(HolidayCalendar { region, records })
}

fn open(path: &Path) -> Result<File, PipelineError> {
    File::open(path).map_err(|e| PipelineError::source_format(path.display().to_string(), format!("failed to open: {e}")))
}

fn csv_reader<R: Read>(reader: R, has_headers: bool) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn read_headers<R: Read>(reader: &mut csv::Reader<R>, source_name: &str) -> Result<StringRecord, PipelineError> {
    reader
        .headers()
        .map(|h| h.clone())
        .map_err(|e| PipelineError::source_format(source_name, format!("failed to read CSV headers: {e}")))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_column(header_map: &HashMap<String, usize>, configured: &str, alias: &str) -> Option<usize> {
    header_map
        .get(&normalize_header_name(configured))
        .or_else(|| header_map.get(alias))
        .copied()
}

fn missing_column(source_name: &str, name: &str) -> PipelineError {
    PipelineError::source_format(source_name, format!("missing required column `{name}`"))
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a timestamp from the wait-time export.
pub fn parse_date_time(s: &str) -> Result<NaiveDateTime, String> {
    const FMTS: [&str; 8] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %I:%M %p",
        "%m/%d/%Y %I:%M:%S %p",
    ];
    for fmt in FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    // A bare date means midnight.
    if let Ok(d) = parse_date(s) {
        return Ok(d.and_hms_opt(0, 0, 0).unwrap_or_default());
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected YYYY-MM-DD HH:MM[:SS] or MM/DD/YYYY HH:MM [AM/PM]."
    ))
}

/// Parse a calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, MM/DD/YYYY, YYYY/MM/DD, DD-MM-YYYY."
    ))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse an exchange-rate cell; placeholders (`.`), non-numeric and
/// non-positive values are missing.
fn parse_rate(s: Option<&str>) -> Option<f64> {
    let s = s?;
    if s == "." {
        return None;
    }
    parse_opt_f64(Some(s)).filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> WaitTimeColumns {
        WaitTimeColumns {
            date_time: "Group Starts".to_string(),
            delay: "Avg - Delay (Peace Arch South Cars)".to_string(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn wait_times_use_configured_headers_and_zero_missing_delay() {
        let csv = "\u{feff}Group Starts,Avg - Delay (Peace Arch South Cars)\n\
                   2018-08-25 08:00:00,12.5\n\
                   2018-08-25 08:30:00,\n\
                   08/25/2018 09:00 AM,n/a\n";
        let src = read_wait_times(csv.as_bytes(), "wait.csv", &columns(), None).unwrap();

        assert_eq!(src.rows_read, 3);
        assert_eq!(src.missing_delay, 2);
        let delays: Vec<f64> = src.observations.iter().map(|o| o.delay).collect();
        assert_eq!(delays, vec![12.5, 0.0, 0.0]);
        assert_eq!(src.observations[2].hour_of_day(), 9);
    }

    #[test]
    fn wait_times_accept_renamed_columns() {
        let csv = "Date_time,Delay\n2018-08-25 23:15,4\n";
        let src = read_wait_times(csv.as_bytes(), "wait.csv", &columns(), None).unwrap();
        assert_eq!(src.observations.len(), 1);
        assert_eq!(src.observations[0].hour_of_day(), 23);
    }

    #[test]
    fn wait_times_count_negative_delays() {
        let csv = "Date_time,Delay\n2018-08-25 10:00,-40\n2018-08-25 11:00,0\n2018-08-25 12:00,-0.5\n";
        let src = read_wait_times(csv.as_bytes(), "wait.csv", &columns(), None).unwrap();
        assert_eq!(src.negative_delay, 2);
        assert_eq!(src.observations[0].delay, -40.0);
        assert_eq!(src.observations.len(), 3);
    }

    #[test]
    fn wait_times_drop_rows_outside_window() {
        let window = DateWindow {
            begin: d(2018, 8, 25),
            end: d(2018, 8, 26),
            test_start: d(2018, 8, 26),
            test_end: d(2018, 8, 26),
        };
        let csv = "Date_time,Delay\n2018-08-24 10:00,1\n2018-08-25 10:00,2\n2018-08-27 10:00,3\n";
        let src = read_wait_times(csv.as_bytes(), "wait.csv", &columns(), Some(&window)).unwrap();
        assert_eq!(src.outside_window, 2);
        assert_eq!(src.observations.len(), 1);
    }

    #[test]
    fn wait_times_missing_column_is_source_format_error() {
        let csv = "Timestamp,Delay\n2018-08-25 10:00,1\n";
        let err = read_wait_times(csv.as_bytes(), "wait.csv", &columns(), None).unwrap_err();
        assert!(matches!(err, PipelineError::SourceFormat { .. }));
        assert!(err.to_string().contains("Group Starts"));
    }

    #[test]
    fn wait_times_bad_timestamp_names_the_line() {
        let csv = "Date_time,Delay\n2018-08-25 10:00,1\nyesterday,2\n";
        let err = read_wait_times(csv.as_bytes(), "wait.csv", &columns(), None).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn exchange_rates_treat_placeholders_as_missing() {
        let csv = "DATE,DEXCAUS\n2013-01-01,.\n2013-01-02,0.9876\n2013-01-03,abc\n2013-01-04,-1\n";
        let src = read_exchange_rates(csv.as_bytes(), "fx.csv").unwrap();
        assert_eq!(src.records.len(), 4);
        assert_eq!(src.placeholders, 3);
        assert_eq!(src.records[0].rate, None);
        assert_eq!(src.records[1].rate, Some(0.9876));
        assert_eq!(src.records[1].date, d(2013, 1, 2));
    }

    #[test]
    fn exchange_rates_bad_date_is_fatal() {
        let csv = "DATE,DEXCAUS\nnot-a-date,1.0\n";
        let err = read_exchange_rates(csv.as_bytes(), "fx.csv").unwrap_err();
        assert!(matches!(err, PipelineError::SourceFormat { .. }));
    }

    #[test]
    fn holidays_skip_observances_and_duplicate_dates() {
        let csv = "Year,Date,Holiday\n\
                   2018,2018-05-13,Mother's Day\n\
                   2018,2018-07-01,Canada Day\n\
                   2018,2018-07-01,Canada Day (observed)\n\
                   2018,2018-08-06,\n";
        let cal = read_holidays(csv.as_bytes(), "bc.csv", HolidayRegion::Bc).unwrap();
        assert_eq!(cal.records.len(), 2);
        assert_eq!(cal.records[0].name.as_deref(), Some("Canada Day"));
        assert_eq!(cal.records[1].name, None);
    }

    #[test]
    fn holidays_require_holiday_column() {
        let csv = "Date,Name\n2018-07-01,Canada Day\n";
        let err = read_holidays(csv.as_bytes(), "bc.csv", HolidayRegion::Bc).unwrap_err();
        assert!(err.to_string().contains("Holiday"));
    }
}
