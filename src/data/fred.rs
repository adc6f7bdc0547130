//! FRED API integration for the daily USD/CAD exchange rate.
//!
//! `fetch-rates` downloads a series into the same two-column CSV layout FRED's
//! own export uses (`DATE,<SERIES>` with `.` for unavailable days), so the file
//! can be fed straight back to the exchange-rate ingest.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::AppError;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const OBS_LIMIT: usize = 100000;

/// Canada / U.S. foreign exchange rate, CAD per USD, daily.
pub const SERIES_USD_CAD: &str = "DEXCAUS";

/// One daily observation; `None` where FRED reports `.`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateObservation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

pub struct FredClient {
    client: Client,
    api_key: String,
}

impl FredClient {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("FRED_API_KEY")
            .map_err(|_| AppError::new(2, "Missing FRED_API_KEY in environment (.env)."))?;
        Ok(Self {
            client: Client::new(),
            api_key,
        })
    }

    /// Fetch `series_id` between `start` and `end` (inclusive), oldest first.
    pub fn fetch_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>, AppError> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("series_id", series_id),
                ("api_key", &self.api_key),
                ("file_type", "json"),
                ("sort_order", "asc"),
                ("observation_start", &start.to_string()),
                ("observation_end", &end.to_string()),
                ("limit", &OBS_LIMIT.to_string()),
            ])
            .send()
            .map_err(|e| AppError::new(4, format!("FRED request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("FRED request failed with status {}.", resp.status()),
            ));
        }

        let body: ObservationsResponse = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse FRED response: {e}")))?;

        let out = parse_observations(body)?;
        if out.is_empty() {
            return Err(AppError::new(
                4,
                format!("No observations returned for series {series_id} between {start} and {end}."),
            ));
        }
        log::info!(
            "Fetched {} {series_id} observations ({} unavailable)",
            out.len(),
            out.iter().filter(|o| o.value.is_none()).count()
        );
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

fn parse_observations(body: ObservationsResponse) -> Result<Vec<RateObservation>, AppError> {
    body.observations
        .into_iter()
        .map(|obs| {
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
                .map_err(|e| AppError::new(4, format!("Invalid FRED date '{}': {e}", obs.date)))?;
            Ok(RateObservation {
                date,
                value: parse_value(&obs.value),
            })
        })
        .collect()
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Write observations as `DATE,<series_id>` CSV.
pub fn write_rates_csv<W: Write>(writer: W, series_id: &str, observations: &[RateObservation]) -> Result<(), AppError> {
    let fail = |e: csv::Error| AppError::new(2, format!("Failed to write exchange-rate CSV: {e}"));
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["DATE", series_id]).map_err(fail)?;
    for obs in observations {
        let value = obs.value.map(|v| v.to_string()).unwrap_or_else(|| ".".to_string());
        out.write_record([obs.date.to_string(), value]).map_err(fail)?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write exchange-rate CSV: {e}")))?;
    Ok(())
}

/// Download `series_id` into `path` (creating parent directories).
pub fn download_rates(
    client: &FredClient,
    series_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    path: &Path,
) -> Result<usize, AppError> {
    let observations = client.fetch_series(series_id, start, end)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
    write_rates_csv(file, series_id, &observations)?;

    log::info!("Wrote {} rows to {}", observations.len(), path.display());
    Ok(observations.len())
}
