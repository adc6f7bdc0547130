//! Read/write the trained model.
//!
//! A model is two files: the JSON card (feature schema including the holiday
//! vocabulary, booster parameters, early-stopping outcome) at the configured
//! path, and the native XGBoost model next to it with a `.xgb` extension. The
//! card names its booster file so the pair can be moved together.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::boost::Booster;
use crate::error::PipelineError;
use crate::forecast::{ForecastModel, ModelCard};

pub const MODEL_FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub format_version: u32,
    pub train_rows: usize,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
    /// File name of the booster, relative to the JSON file.
    pub booster_file: String,
    pub model: ModelCard,
}

/// Where the booster of the model JSON at `path` lives.
pub fn booster_path(path: &Path) -> PathBuf {
    path.with_extension("xgb")
}

/// Write the booster and then the JSON card that points at it.
pub fn write_model_json(path: &Path, file: &ModelFile, booster: &Booster) -> Result<(), PipelineError> {
    let fail = |message: String| PipelineError::Export {
        what: "model JSON",
        path: path.display().to_string(),
        message,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;
    }
    let booster_file = path.with_file_name(&file.booster_file);
    booster.save(&booster_file)?;

    let out = File::create(path).map_err(|e| fail(e.to_string()))?;
    let mut writer = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut writer, file).map_err(|e| fail(e.to_string()))?;
    writer.flush().map_err(|e| fail(e.to_string()))?;

    Ok(())
}

pub fn read_model_json(path: &Path) -> Result<(ModelFile, ForecastModel), PipelineError> {
    let source = path.display().to_string();
    let file = File::open(path).map_err(|e| PipelineError::source_format(&source, format!("cannot open model: {e}")))?;
    let card: ModelFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PipelineError::source_format(&source, format!("invalid model JSON: {e}")))?;

    if card.format_version != MODEL_FORMAT_VERSION {
        return Err(PipelineError::source_format(
            source,
            format!(
                "unsupported model format version {} (expected {MODEL_FORMAT_VERSION})",
                card.format_version
            ),
        ));
    }

    let booster = Booster::load(
        &path.with_file_name(&card.booster_file),
        card.model.params.clone(),
        card.model.schema.len(),
        card.model.n_rounds,
    )?;
    let model = ForecastModel::from_card(card.model.clone(), booster)?;
    Ok((card, model))
}
