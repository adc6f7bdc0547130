use std::fmt;
use std::path::Path;

use nalgebra::DMatrix;
use xgboost::{Booster as XgbBooster, DMatrix as XgbMatrix, XGBError};

use crate::boost::params::BoosterParams;
use crate::error::PipelineError;

/// A trained XGBoost ensemble plus the shape it was trained on.
pub struct Booster {
    inner: XgbBooster,
    params: BoosterParams,
    n_features: usize,
    n_rounds: usize,
}

/// Per-feature usage across all trees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureImportance {
    pub splits: usize,
    pub total_gain: f64,
}

impl fmt::Debug for Booster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Booster")
            .field("params", &self.params)
            .field("n_features", &self.n_features)
            .field("n_rounds", &self.n_rounds)
            .finish_non_exhaustive()
    }
}

impl Booster {
    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    pub fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<f64>, PipelineError> {
        if x.ncols() != self.n_features {
            return Err(PipelineError::Training(format!(
                "feature matrix has {} columns but the model was trained on {}",
                x.ncols(),
                self.n_features
            )));
        }
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }
        let dmat = to_xgb_matrix(x, None)?;
        let pred = self.inner.predict(&dmat).map_err(xgb("predict"))?;
        Ok(pred.into_iter().map(f64::from).collect())
    }

    /// Split counts and summed gain per feature, read from the tree dump.
    pub fn feature_importance(&self) -> Result<Vec<FeatureImportance>, PipelineError> {
        let dump = self.inner.dump_model(true, None).map_err(xgb("dump model"))?;
        Ok(importance_from_dump(&dump, self.n_features))
    }

    /// Write the native XGBoost model file.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        self.inner.save(path).map_err(|e| PipelineError::Export {
            what: "booster",
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path, params: BoosterParams, n_features: usize, n_rounds: usize) -> Result<Self, PipelineError> {
        let inner = XgbBooster::load(path).map_err(|e| {
            PipelineError::source_format(path.display().to_string(), format!("cannot load booster: {e}"))
        })?;
        Ok(Self {
            inner,
            params,
            n_features,
            n_rounds,
        })
    }
}

/// Parse `[f<idx><...] ...,gain=<g>,...` split lines of a text dump.
pub fn importance_from_dump(dump: &str, n_features: usize) -> Vec<FeatureImportance> {
    let mut out = vec![FeatureImportance::default(); n_features];
    for line in dump.lines() {
        let Some(open) = line.find("[f") else {
            continue;
        };
        let rest = &line[open + 2..];
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let Ok(feature) = rest[..end].parse::<usize>() else {
            continue;
        };
        let gain = line
            .split(',')
            .find_map(|kv| kv.trim().strip_prefix("gain="))
            .and_then(|g| g.parse::<f64>().ok())
            .unwrap_or(0.0);
        if let Some(imp) = out.get_mut(feature) {
            imp.splits += 1;
            imp.total_gain += gain;
        }
    }
    out
}

/// Incremental boosting over a fixed training matrix and one watched
/// evaluation matrix.
///
/// Each call to [`boost_round`](Self::boost_round) adds one tree; both
/// matrices are cached in the booster so per-round predictions stay cheap and
/// a caller can decide when to stop.
pub struct BoostingSession {
    train: XgbMatrix,
    eval: XgbMatrix,
    inner: XgbBooster,
    params: BoosterParams,
    n_features: usize,
    rounds: usize,
}

impl BoostingSession {
    pub fn new(
        params: BoosterParams,
        x: &DMatrix<f64>,
        y: &[f64],
        eval_x: &DMatrix<f64>,
    ) -> Result<Self, PipelineError> {
        let xgb_params = params.to_xgboost()?;
        if x.nrows() == 0 {
            return Err(PipelineError::Training("training matrix has no rows".to_string()));
        }
        if x.nrows() != y.len() {
            return Err(PipelineError::Training(format!(
                "training matrix has {} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if eval_x.nrows() == 0 || eval_x.ncols() != x.ncols() {
            return Err(PipelineError::Training(format!(
                "evaluation matrix is {}x{}, training matrix has {} features",
                eval_x.nrows(),
                eval_x.ncols(),
                x.ncols()
            )));
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::Training(format!("training label {i} is not finite")));
        }
        if x.iter().chain(eval_x.iter()).any(|v| !v.is_finite()) {
            return Err(PipelineError::Training("features contain non-finite values".to_string()));
        }

        let train = to_xgb_matrix(x, Some(y))?;
        let eval = to_xgb_matrix(eval_x, None)?;
        let inner = XgbBooster::new_with_cached_dmats(&xgb_params, &[&train, &eval]).map_err(xgb("create booster"))?;

        Ok(Self {
            train,
            eval,
            inner,
            params,
            n_features: x.ncols(),
            rounds: 0,
        })
    }

    /// Fit and append one tree; returns the number of trees so far.
    pub fn boost_round(&mut self) -> Result<usize, PipelineError> {
        let iteration = i32::try_from(self.rounds)
            .map_err(|_| PipelineError::Training(format!("round {} out of range", self.rounds)))?;
        self.inner.update(&self.train, iteration).map_err(xgb("update"))?;
        self.rounds += 1;
        Ok(self.rounds)
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Current in-sample predictions.
    pub fn train_predictions(&self) -> Result<Vec<f64>, PipelineError> {
        let pred = self.inner.predict(&self.train).map_err(xgb("predict"))?;
        Ok(pred.into_iter().map(f64::from).collect())
    }

    pub fn eval_predictions(&self) -> Result<Vec<f64>, PipelineError> {
        let pred = self.inner.predict(&self.eval).map_err(xgb("predict"))?;
        Ok(pred.into_iter().map(f64::from).collect())
    }

    pub fn into_booster(self) -> Booster {
        Booster {
            inner: self.inner,
            params: self.params,
            n_features: self.n_features,
            n_rounds: self.rounds,
        }
    }
}

/// Row-major f32 copy of `x`, optionally labelled.
fn to_xgb_matrix(x: &DMatrix<f64>, labels: Option<&[f64]>) -> Result<XgbMatrix, PipelineError> {
    if x.nrows() == 0 {
        return Err(PipelineError::Training("cannot build an empty feature matrix".to_string()));
    }
    let mut data = Vec::with_capacity(x.nrows() * x.ncols());
    for row in x.row_iter() {
        data.extend(row.iter().map(|v| *v as f32));
    }
    let mut dmat = XgbMatrix::from_dense(&data, x.nrows()).map_err(xgb("build matrix"))?;
    if let Some(y) = labels {
        let y: Vec<f32> = y.iter().map(|v| *v as f32).collect();
        dmat.set_labels(&y).map_err(xgb("set labels"))?;
    }
    Ok(dmat)
}

fn xgb(context: &'static str) -> impl Fn(XGBError) -> PipelineError {
    move |e| PipelineError::Training(format!("xgboost {context}: {e}"))
}
