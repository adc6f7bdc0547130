use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::boost::{Booster, BoosterParams, FeatureImportance};
use crate::domain::StoppingRule;
use crate::error::PipelineError;
use crate::features::FeatureSchema;
use crate::forecast::Convergence;
use crate::split::Partition;

/// A trained wait-time model together with the feature layout it expects.
#[derive(Debug)]
pub struct ForecastModel {
    pub schema: FeatureSchema,
    pub stopping: StoppingRule,
    pub best_round: usize,
    pub best_eval_rmse: f64,
    pub convergence: Convergence,
    pub booster: Booster,
}

/// Everything about a [`ForecastModel`] except the trees themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    pub schema: FeatureSchema,
    pub params: BoosterParams,
    pub stopping: StoppingRule,
    pub n_rounds: usize,
    pub best_round: usize,
    pub best_eval_rmse: f64,
    pub convergence: Convergence,
}

/// One feature's share of the ensemble's splits.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    pub name: String,
    pub splits: usize,
    pub total_gain: f64,
}

impl ForecastModel {
    pub fn card(&self) -> ModelCard {
        ModelCard {
            schema: self.schema.clone(),
            params: self.booster.params().clone(),
            stopping: self.stopping,
            n_rounds: self.booster.n_rounds(),
            best_round: self.best_round,
            best_eval_rmse: self.best_eval_rmse,
            convergence: self.convergence,
        }
    }

    /// Reassemble a model from its card and a booster loaded separately.
    pub fn from_card(card: ModelCard, booster: Booster) -> Result<Self, PipelineError> {
        if booster.n_features() != card.schema.len() {
            return Err(PipelineError::Training(format!(
                "booster expects {} features, schema has {}",
                booster.n_features(),
                card.schema.len()
            )));
        }
        Ok(Self {
            schema: card.schema,
            stopping: card.stopping,
            best_round: card.best_round,
            best_eval_rmse: card.best_eval_rmse,
            convergence: card.convergence,
            booster,
        })
    }

    /// Predict one delay (minutes) per row. Values are not clipped.
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<f64>, PipelineError> {
        if x.ncols() != self.schema.len() {
            return Err(PipelineError::Training(format!(
                "expected {} feature columns ({}...), got {}",
                self.schema.len(),
                self.schema.names.first().map(String::as_str).unwrap_or(""),
                x.ncols()
            )));
        }
        self.booster.predict(x)
    }

    pub fn predict_partition(&self, part: &Partition<'_>) -> Result<Vec<f64>, PipelineError> {
        self.predict(&part.features())
    }

    /// Features ordered by total split gain, unused features omitted.
    pub fn ranked_features(&self) -> Result<Vec<RankedFeature>, PipelineError> {
        Ok(rank_features(&self.booster.feature_importance()?, &self.schema.names))
    }
}

pub fn rank_features(importance: &[FeatureImportance], names: &[String]) -> Vec<RankedFeature> {
    let mut ranked: Vec<RankedFeature> = importance
        .iter()
        .zip(names)
        .filter(|(imp, _)| imp.splits > 0)
        .map(|(imp, name)| RankedFeature {
            name: name.clone(),
            splits: imp.splits,
            total_gain: imp.total_gain,
        })
        .collect();
    ranked.sort_by(|a, b| b.total_gain.total_cmp(&a.total_gain).then_with(|| a.name.cmp(&b.name)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boost::BoostingSession;
    use crate::features::HolidayVocabulary;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(HolidayVocabulary {
            bc: vec!["Canada Day".to_string()],
            wa: vec![],
        })
    }

    fn model() -> ForecastModel {
        let schema = schema();
        let x = DMatrix::from_fn(48, schema.len(), |i, j| if j == 0 { (i % 24) as f64 } else { 1.0 });
        let y: Vec<f64> = (0..48).map(|i| if i % 24 >= 12 { 30.0 } else { 5.0 }).collect();
        let mut s = BoostingSession::new(BoosterParams::default(), &x, &y, &x).unwrap();
        s.boost_round().unwrap();
        ForecastModel {
            stopping: StoppingRule {
                patience: 10,
                max_rounds: 100,
            },
            best_round: 1,
            best_eval_rmse: 1.0,
            convergence: Convergence::EarlyStopped,
            booster: s.into_booster(),
            schema,
        }
    }

    #[test]
    fn rejects_wrong_width() {
        let m = model();
        assert_eq!(m.predict(&DMatrix::zeros(2, 7)).unwrap().len(), 2);
        let err = m.predict(&DMatrix::zeros(1, 6)).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn card_round_trips_through_from_card() {
        let m = model();
        let card = m.card();
        assert_eq!(card.n_rounds, 1);
        assert_eq!(card.params, BoosterParams::default());

        let ForecastModel { booster, .. } = m;
        let back = ForecastModel::from_card(card.clone(), booster).unwrap();
        assert_eq!(back.card(), card);
    }

    #[test]
    fn ranks_used_features_by_gain() {
        let names = schema().names;
        let mut imp = vec![FeatureImportance::default(); names.len()];
        imp[0] = FeatureImportance {
            splits: 3,
            total_gain: 50.0,
        };
        imp[6] = FeatureImportance {
            splits: 1,
            total_gain: 8.0,
        };
        let ranked = rank_features(&imp, &names);
        let got: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(got, vec!["HourOfDay", "Holiday_bc_Canada Day"]);
        assert_eq!(ranked[0].splits, 3);
    }
}
