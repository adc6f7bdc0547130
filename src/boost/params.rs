use serde::{Deserialize, Serialize};
use xgboost::parameters::learning::{EvaluationMetric, LearningTaskParametersBuilder, Metrics, Objective};
use xgboost::parameters::tree::TreeBoosterParametersBuilder;
use xgboost::parameters::{BoosterParameters, BoosterParametersBuilder, BoosterType};

use crate::error::PipelineError;

/// Booster hyperparameters.
///
/// Defaults are the reproducible configuration of the wait-time model; they
/// are not tuned at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    /// Shrinkage applied to every leaf value (eta).
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of training rows sampled for each tree.
    pub subsample: f64,
    /// Fraction of feature columns sampled for each tree.
    pub colsample_bytree: f64,
    /// L2 regularization on leaf weights (lambda).
    pub reg_lambda: f64,
    /// Minimum loss reduction required to split a node (gamma).
    pub min_split_gain: f64,
    /// Minimum hessian sum in each child.
    pub min_child_weight: f64,
    /// Initial prediction for every row.
    pub base_score: f64,
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_depth: 10,
            subsample: 0.5,
            colsample_bytree: 0.7,
            reg_lambda: 0.2,
            min_split_gain: 0.2,
            min_child_weight: 1.0,
            base_score: 0.5,
            seed: 0,
        }
    }
}

impl BoosterParams {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fraction = |v: f64| v.is_finite() && v > 0.0 && v <= 1.0;
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("learning rate must be > 0"));
        }
        if self.max_depth == 0 || self.max_depth > u32::MAX as usize {
            return Err(invalid("max depth must be >= 1"));
        }
        if !fraction(self.subsample) {
            return Err(invalid("subsample must be in (0, 1]"));
        }
        if !fraction(self.colsample_bytree) {
            return Err(invalid("column subsample must be in (0, 1]"));
        }
        if !(self.reg_lambda.is_finite() && self.reg_lambda >= 0.0) {
            return Err(invalid("lambda must be >= 0"));
        }
        if !(self.min_split_gain.is_finite() && self.min_split_gain >= 0.0) {
            return Err(invalid("gamma must be >= 0"));
        }
        if !(self.min_child_weight.is_finite() && self.min_child_weight >= 0.0) {
            return Err(invalid("min child weight must be >= 0"));
        }
        if !self.base_score.is_finite() {
            return Err(invalid("base score must be finite"));
        }
        Ok(())
    }

    /// XGBoost parameters: squared-error regression tree booster, RMSE metric.
    pub fn to_xgboost(&self) -> Result<BoosterParameters, PipelineError> {
        self.validate()?;

        let tree = TreeBoosterParametersBuilder::default()
            .eta(self.learning_rate as f32)
            .gamma(self.min_split_gain as f32)
            .max_depth(self.max_depth as u32)
            .min_child_weight(self.min_child_weight as f32)
            .subsample(self.subsample as f32)
            .colsample_bytree(self.colsample_bytree as f32)
            .lambda(self.reg_lambda as f32)
            .build()
            .map_err(|e| invalid(&e.to_string()))?;

        let learning = LearningTaskParametersBuilder::default()
            .objective(Objective::RegLinear)
            .base_score(self.base_score as f32)
            .eval_metrics(Metrics::Custom(vec![EvaluationMetric::RMSE]))
            .seed(self.seed)
            .build()
            .map_err(|e| invalid(&e.to_string()))?;

        BoosterParametersBuilder::default()
            .booster_type(BoosterType::Tree(tree))
            .learning_params(learning)
            .verbose(false)
            .build()
            .map_err(|e| invalid(&e.to_string()))
    }
}

fn invalid(msg: &str) -> PipelineError {
    PipelineError::InvalidConfig(format!("booster: {msg}"))
}
