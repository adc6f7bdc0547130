//! Remote data acquisition.

pub mod fred;

pub use fred::{FredClient, RateObservation, SERIES_USD_CAD, download_rates};
