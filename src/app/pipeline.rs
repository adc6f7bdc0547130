//! Shared pipeline logic used by the `train` and `explore` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> join -> features -> split -> train -> predict -> export
//!
//! Each stage consumes the previous stage's immutable output; nothing is
//! written to disk until prediction has succeeded.

use crate::domain::{DateWindow, HolidayCalendar, HolidayRegion, PipelineConfig};
use crate::error::PipelineError;
use crate::features::{EncodedRow, FeatureSchema, FeatureTable, build_feature_table};
use crate::forecast::model::RankedFeature;
use crate::forecast::{ForecastModel, Trainer, TrainingReport};
use crate::io::ingest::{ExchangeRateSource, IngestSummary, WaitTimeSource};
use crate::io::{MODEL_FORMAT_VERSION, ModelFile, booster_path};
use crate::join::{JoinStats, join_sources};
use crate::report::{
    DayComparison, DelayProfile, TestMetrics, YearlyRate, daily_comparisons, delay_profiles, yearly_delay_vs_rate,
};
use crate::split::{SplitSummary, split_by_date};

/// The joined, encoded table plus what it took to build it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub ingest: IngestSummary,
    pub join: JoinStats,
    pub table: FeatureTable,
}

impl Dataset {
    pub fn profiles(&self) -> Vec<DelayProfile> {
        delay_profiles(self.table.rows.iter().map(|e| &e.row))
    }

    pub fn yearly(&self) -> Vec<YearlyRate> {
        yearly_delay_vs_rate(self.table.rows.iter().map(|e| &e.row))
    }
}

/// All computed outputs of a single `bwt train` run.
#[derive(Debug)]
pub struct RunOutput {
    pub ingest: IngestSummary,
    pub join: JoinStats,
    pub schema: FeatureSchema,
    pub profiles: Vec<DelayProfile>,
    pub yearly: Vec<YearlyRate>,
    pub split: SplitSummary,
    pub model: ForecastModel,
    pub report: TrainingReport,
    /// Test partition rows, aligned with `predictions`.
    pub test_rows: Vec<EncodedRow>,
    pub predictions: Vec<f64>,
    pub metrics: TestMetrics,
    pub days: Vec<DayComparison>,
    pub ranked: Vec<RankedFeature>,
}

/// Execute the full pipeline, write the model and predictions, and return
/// the computed outputs.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    let dataset = load_dataset(config)?;
    let run = train_and_predict(dataset, config)?;
    write_outputs(&run, config)?;
    Ok(run)
}

/// Load all four sources and build the feature table.
pub fn load_dataset(config: &PipelineConfig) -> Result<Dataset, PipelineError> {
    validate_window(&config.window)?;

    let paths = &config.paths;
    let wait = crate::io::load_wait_times(&paths.wait_times, &config.columns, Some(&config.window))?;
    let rates = crate::io::load_exchange_rates(&paths.exchange_rates)?;
    let bc = crate::io::load_holidays(&paths.holidays_bc, HolidayRegion::Bc)?;
    let wa = crate::io::load_holidays(&paths.holidays_wa, HolidayRegion::Wa)?;

    log::info!(
        "Loaded {} wait-time observations, {} exchange-rate days, {}/{} BC/WA holiday entries",
        wait.observations.len(),
        rates.records.len(),
        bc.records.len(),
        wa.records.len()
    );

    build_dataset(wait, rates, bc, wa)
}

/// Join already-loaded sources and encode features.
pub fn build_dataset(
    wait: WaitTimeSource,
    rates: ExchangeRateSource,
    bc: HolidayCalendar,
    wa: HolidayCalendar,
) -> Result<Dataset, PipelineError> {
    let ingest = IngestSummary::new(&wait, &rates, &bc, &wa);
    let joined = join_sources(&wait.observations, &rates.records, &bc, &wa)?;
    let table = build_feature_table(joined.rows)?;
    Ok(Dataset {
        ingest,
        join: joined.stats,
        table,
    })
}

/// Split, train with early stopping and predict the test window. Pure: no
/// files are touched.
pub fn train_and_predict(dataset: Dataset, config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    validate_window(&config.window)?;
    let window = &config.window;

    let profiles = dataset.profiles();
    let yearly = dataset.yearly();

    let split = split_by_date(&dataset.table, window.test_start, window.test_end)?;
    let summary = split.summary(&dataset.table.schema);
    if !summary.test_only_holidays.is_empty() {
        log::warn!(
            "Holiday columns present only in the test window: {}",
            summary.test_only_holidays.join(", ")
        );
    }

    let mut trainer = Trainer::new(config.booster.clone(), config.stopping)?;
    let (model, report) = trainer.fit(&dataset.table.schema, &split.train, &split.test)?;

    let predictions = model.predict_partition(&split.test)?;
    if let Some(i) = predictions.iter().position(|p| !p.is_finite()) {
        return Err(PipelineError::Training(format!("prediction {i} is not finite")));
    }

    let test_rows: Vec<EncodedRow> = split.test.rows.iter().map(|r| (*r).clone()).collect();
    let actual: Vec<f64> = test_rows.iter().map(|r| r.row.delay).collect();
    let metrics = TestMetrics::new(&actual, &predictions);
    let days = daily_comparisons(&test_rows, &predictions);
    let ranked = model.ranked_features()?;

    log::info!(
        "Predicted {} test rows (RMSE {:.3}, MAE {:.3})",
        predictions.len(),
        metrics.rmse,
        metrics.mae
    );

    Ok(RunOutput {
        ingest: dataset.ingest,
        join: dataset.join,
        schema: dataset.table.schema.clone(),
        profiles,
        yearly,
        split: summary,
        model,
        report,
        test_rows,
        predictions,
        metrics,
        days,
        ranked,
    })
}

/// Persist the predictions CSV, then the model. A model file on disk always
/// has its predictions next to it.
pub fn write_outputs(run: &RunOutput, config: &PipelineConfig) -> Result<(), PipelineError> {
    crate::io::write_predictions_csv(&config.predictions_out, &run.schema, &run.test_rows, &run.predictions)?;
    log::info!(
        "Wrote {} predictions to {}",
        run.predictions.len(),
        config.predictions_out.display()
    );

    let booster_file = booster_path(&config.model_out)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "model.xgb".to_string());
    let model_file = ModelFile {
        tool: "bwt".to_string(),
        format_version: MODEL_FORMAT_VERSION,
        train_rows: run.split.train_rows,
        test_start: config.window.test_start,
        test_end: config.window.test_end,
        booster_file,
        model: run.model.card(),
    };
    crate::io::write_model_json(&config.model_out, &model_file, &run.model.booster)
}

fn validate_window(w: &DateWindow) -> Result<(), PipelineError> {
    if w.begin > w.end {
        return Err(PipelineError::InvalidConfig(format!(
            "begin date {} is after end date {}",
            w.begin, w.end
        )));
    }
    if w.test_start > w.test_end {
        return Err(PipelineError::InvalidConfig(format!(
            "test window start {} is after its end {}",
            w.test_start, w.test_end
        )));
    }
    Ok(())
}
