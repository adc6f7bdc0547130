//! Command-line parsing for the border wait-time forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the join/feature/boosting code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "bwt",
    version,
    about = "Peace Arch southbound wait-time forecaster (gradient-boosted trees)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join the sources, train the booster with early stopping, predict the test window.
    Train(TrainArgs),
    /// Join the sources and print delay profiles without training.
    Explore(TrainArgs),
    /// Download the daily USD/CAD series from FRED into the exchange-rate CSV.
    FetchRates(FetchArgs),
}

/// Input locations and column names.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Hourly wait-time export.
    #[arg(long, default_value = "data/query_PeaceArch_South_cars.csv")]
    pub wait_times: PathBuf,

    /// Daily exchange-rate CSV (`DATE,<series>`).
    #[arg(long, default_value = "data/cad_usd_exch_rate.csv")]
    pub exchange_rates: PathBuf,

    /// British Columbia holiday calendar.
    #[arg(long, default_value = "data/holidays_bc.csv")]
    pub holidays_bc: PathBuf,

    /// Washington State holiday calendar.
    #[arg(long, default_value = "data/holidays_wa.csv")]
    pub holidays_wa: PathBuf,

    /// Timestamp column of the wait-time export.
    #[arg(long, default_value = "Group Starts")]
    pub time_column: String,

    /// Delay column of the wait-time export (minutes).
    #[arg(long, default_value = "Avg - Delay (Peace Arch South Cars)")]
    pub delay_column: String,
}

/// Options shared by `train` and `explore`.
#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// First day of history kept from the wait-time export.
    #[arg(long, default_value = "2013-01-01")]
    pub begin_date: NaiveDate,

    /// Last day of history kept from the wait-time export.
    #[arg(long, default_value = "2018-08-31")]
    pub end_date: NaiveDate,

    /// First day of the test window.
    #[arg(long, default_value = "2018-08-25")]
    pub test_start: NaiveDate,

    /// Last day of the test window.
    #[arg(long, default_value = "2018-08-31")]
    pub test_end: NaiveDate,

    /// Shrinkage per boosting round (eta).
    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    /// Row sampling fraction per tree.
    #[arg(long, default_value_t = 0.5)]
    pub subsample: f64,

    /// Column sampling fraction per tree.
    #[arg(long, default_value_t = 0.7)]
    pub colsample: f64,

    /// L2 regularization on leaf weights.
    #[arg(long, default_value_t = 0.2)]
    pub lambda: f64,

    /// Minimum split gain.
    #[arg(long, default_value_t = 0.2)]
    pub gamma: f64,

    #[arg(long, default_value_t = 1.0)]
    pub min_child_weight: f64,

    /// Initial prediction before the first tree.
    #[arg(long, default_value_t = 0.5)]
    pub base_score: f64,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Rounds without eval improvement before stopping.
    #[arg(long, default_value_t = 10)]
    pub early_stopping: usize,

    /// Hard cap on boosting rounds.
    #[arg(long, default_value_t = 5000)]
    pub max_rounds: usize,

    /// Where the trained model JSON is written.
    #[arg(long, default_value = "models/border_wait_time_gbt.json")]
    pub model_out: PathBuf,

    /// Where test-window predictions are written.
    #[arg(long, default_value = "data/predictions.csv")]
    pub predictions_out: PathBuf,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 96)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Number of features shown in the importance table.
    #[arg(long, default_value_t = 15)]
    pub top: usize,

    /// Write a markdown debug bundle under `debug/`.
    #[arg(long)]
    pub debug: bool,
}

/// Options for `fetch-rates`.
#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// FRED series id.
    #[arg(long, default_value = crate::data::SERIES_USD_CAD)]
    pub series: String,

    #[arg(long, default_value = "2013-01-01")]
    pub start: NaiveDate,

    #[arg(long, default_value = "2018-08-31")]
    pub end: NaiveDate,

    /// Output CSV.
    #[arg(long, default_value = "data/cad_usd_exch_rate.csv")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_defaults_match_reference_run() {
        let cli = Cli::parse_from(["bwt", "train"]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.test_start, NaiveDate::from_ymd_opt(2018, 8, 25).unwrap());
        assert_eq!(args.early_stopping, 10);
        assert_eq!(args.max_rounds, 5000);
        assert_eq!(args.colsample, 0.7);
        assert_eq!(args.data.delay_column, "Avg - Delay (Peace Arch South Cars)");
    }

    #[test]
    fn fetch_rates_parses_dates() {
        let cli = Cli::parse_from(["bwt", "fetch-rates", "--start", "2017-01-02", "--out", "x.csv"]);
        let Command::FetchRates(args) = cli.command else {
            panic!("expected fetch-rates");
        };
        assert_eq!(args.series, "DEXCAUS");
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2017, 1, 2).unwrap());
        assert_eq!(args.out, PathBuf::from("x.csv"));
    }
}
