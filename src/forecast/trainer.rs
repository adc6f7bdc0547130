use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::boost::{Booster, BoosterParams, BoostingSession};
use crate::domain::StoppingRule;
use crate::error::PipelineError;
use crate::features::FeatureSchema;
use crate::forecast::ForecastModel;
use crate::math::rmse;
use crate::split::Partition;

/// How training ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// Eval RMSE stopped improving for `patience` rounds.
    EarlyStopped,
    /// The round cap was hit while eval RMSE was still improving.
    RoundCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Untrained,
    Training { round: usize },
    Trained(Convergence),
}

/// Metrics after one boosting round (`round` is 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundMetrics {
    pub round: usize,
    pub train_rmse: f64,
    pub eval_rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub history: Vec<RoundMetrics>,
    /// Number of trees kept (the round with the lowest eval RMSE).
    pub best_round: usize,
    pub best_eval_rmse: f64,
    pub rounds_run: usize,
    pub convergence: Convergence,
}

impl TrainingReport {
    pub fn best(&self) -> Option<&RoundMetrics> {
        self.history.get(self.best_round.checked_sub(1)?)
    }
}

/// Early-stopped booster training against a held-out evaluation set.
#[derive(Debug, Clone)]
pub struct Trainer {
    params: BoosterParams,
    stopping: StoppingRule,
    state: TrainerState,
}

impl Trainer {
    pub fn new(params: BoosterParams, stopping: StoppingRule) -> Result<Self, PipelineError> {
        params.validate()?;
        if stopping.patience == 0 {
            return Err(PipelineError::InvalidConfig("early stopping patience must be >= 1".to_string()));
        }
        if stopping.max_rounds == 0 {
            return Err(PipelineError::InvalidConfig("max rounds must be >= 1".to_string()));
        }
        Ok(Self {
            params,
            stopping,
            state: TrainerState::Untrained,
        })
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    /// Train on the train partition, monitoring RMSE on the test partition.
    pub fn fit(
        &mut self,
        schema: &FeatureSchema,
        train: &Partition<'_>,
        eval: &Partition<'_>,
    ) -> Result<(ForecastModel, TrainingReport), PipelineError> {
        let train_x = train.features();
        let train_y: Vec<f64> = train.labels().iter().copied().collect();
        let eval_x = eval.features();
        let eval_y: Vec<f64> = eval.labels().iter().copied().collect();

        if train_x.ncols() != schema.len() || eval_x.ncols() != schema.len() {
            return Err(PipelineError::Training(format!(
                "feature matrices have {}/{} columns but the schema has {}",
                train_x.ncols(),
                eval_x.ncols(),
                schema.len()
            )));
        }

        let (booster, report) = self.fit_matrices(&train_x, &train_y, &eval_x, &eval_y)?;
        let model = ForecastModel {
            schema: schema.clone(),
            stopping: self.stopping,
            best_round: report.best_round,
            best_eval_rmse: report.best_eval_rmse,
            convergence: report.convergence,
            booster,
        };
        Ok((model, report))
    }

    /// Matrix-level training loop. Returns a booster holding exactly the
    /// trees up to its best round.
    pub fn fit_matrices(
        &mut self,
        train_x: &DMatrix<f64>,
        train_y: &[f64],
        eval_x: &DMatrix<f64>,
        eval_y: &[f64],
    ) -> Result<(Booster, TrainingReport), PipelineError> {
        if eval_x.nrows() == 0 || eval_x.nrows() != eval_y.len() {
            return Err(PipelineError::Training(format!(
                "evaluation set has {} rows and {} labels",
                eval_x.nrows(),
                eval_y.len()
            )));
        }
        if eval_x.ncols() != train_x.ncols() {
            return Err(PipelineError::Training(format!(
                "evaluation set has {} features, training set has {}",
                eval_x.ncols(),
                train_x.ncols()
            )));
        }

        let mut session = BoostingSession::new(self.params.clone(), train_x, train_y, eval_x)?;

        let mut history = Vec::new();
        let mut best_round = 0usize;
        let mut best_eval = f64::INFINITY;
        let mut convergence = Convergence::RoundCap;

        log::info!(
            "Training: {} train rows, {} eval rows, {} features (patience {}, cap {})",
            train_x.nrows(),
            eval_x.nrows(),
            train_x.ncols(),
            self.stopping.patience,
            self.stopping.max_rounds
        );

        for round in 1..=self.stopping.max_rounds {
            self.state = TrainerState::Training { round };

            session.boost_round()?;
            let metrics = RoundMetrics {
                round,
                train_rmse: rmse(&session.train_predictions()?, train_y),
                eval_rmse: rmse(&session.eval_predictions()?, eval_y),
            };
            if !(metrics.train_rmse.is_finite() && metrics.eval_rmse.is_finite()) {
                return Err(PipelineError::Training(format!(
                    "non-finite RMSE at round {round} (train {}, eval {})",
                    metrics.train_rmse, metrics.eval_rmse
                )));
            }
            log::debug!(
                "[{round}] train-rmse:{:.5} eval-rmse:{:.5}",
                metrics.train_rmse,
                metrics.eval_rmse
            );
            history.push(metrics);

            if metrics.eval_rmse < best_eval {
                best_eval = metrics.eval_rmse;
                best_round = round;
            } else if round - best_round >= self.stopping.patience {
                convergence = Convergence::EarlyStopped;
                break;
            }
        }

        let rounds_run = history.len();
        match convergence {
            Convergence::EarlyStopped => log::info!(
                "Early stopping after {rounds_run} rounds; best round {best_round} (eval RMSE {best_eval:.4})"
            ),
            Convergence::RoundCap => log::warn!(
                "Reached the round cap of {} without early stopping; keeping best round {best_round} (eval RMSE {best_eval:.4})",
                self.stopping.max_rounds
            ),
        }

        // Boosting is seeded, so replaying `best_round` rounds rebuilds the
        // same trees without the ones after the best round.
        let booster = if best_round < rounds_run {
            log::debug!("Refitting {best_round} rounds to drop {} trailing trees", rounds_run - best_round);
            let mut refit = BoostingSession::new(self.params.clone(), train_x, train_y, eval_x)?;
            while refit.rounds() < best_round {
                refit.boost_round()?;
            }
            refit.into_booster()
        } else {
            session.into_booster()
        };
        self.state = TrainerState::Trained(convergence);

        Ok((
            booster,
            TrainingReport {
                history,
                best_round,
                best_eval_rmse: best_eval,
                rounds_run,
                convergence,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hourly step pattern. Training labels also carry a bump tied to column
    /// 2, which the evaluation labels lack, so eval RMSE has an interior minimum.
    fn data(n: usize, offset: usize, spurious: bool) -> (DMatrix<f64>, Vec<f64>) {
        let x = DMatrix::from_fn(n, 3, |i, j| match j {
            0 => ((i + offset) % 24) as f64,
            1 => ((i + offset) / 24 % 7) as f64,
            _ => ((i + offset) % 5) as f64,
        });
        let y = (0..n)
            .map(|i| {
                let h = (i + offset) % 24;
                let base = if (7..19).contains(&h) { 40.0 } else { 10.0 };
                if spurious && (i + offset) % 5 == 0 { base + 8.0 } else { base }
            })
            .collect();
        (x, y)
    }

    fn stopping(patience: usize, max_rounds: usize) -> StoppingRule {
        StoppingRule { patience, max_rounds }
    }

    #[test]
    fn stops_early_and_keeps_best_round() {
        let (tx, ty) = data(24 * 14, 0, true);
        let (ex, ey) = data(24 * 2, 24 * 14, false);
        let mut trainer = Trainer::new(BoosterParams::default(), stopping(10, 5000)).unwrap();
        assert_eq!(trainer.state(), TrainerState::Untrained);

        let (booster, report) = trainer.fit_matrices(&tx, &ty, &ex, &ey).unwrap();

        assert_eq!(report.convergence, Convergence::EarlyStopped);
        assert_eq!(trainer.state(), TrainerState::Trained(Convergence::EarlyStopped));
        assert_eq!(report.rounds_run, report.best_round + 10);
        assert_eq!(booster.n_rounds(), report.best_round);
        assert_eq!(report.history.len(), report.rounds_run);

        let best = report.best().unwrap();
        assert_eq!(best.eval_rmse, report.best_eval_rmse);
        assert!(report.history.iter().all(|m| m.eval_rmse >= report.best_eval_rmse));

        let pred = booster.predict(&ex).unwrap();
        assert!((rmse(&pred, &ey) - report.best_eval_rmse).abs() < 1e-4);
    }

    #[test]
    fn round_cap_is_reported_not_fatal() {
        let (tx, ty) = data(24 * 7, 0, true);
        let (ex, ey) = data(24, 24 * 7, false);
        let mut trainer = Trainer::new(BoosterParams::default(), stopping(10, 3)).unwrap();
        let (booster, report) = trainer.fit_matrices(&tx, &ty, &ex, &ey).unwrap();

        assert_eq!(report.convergence, Convergence::RoundCap);
        assert_eq!(report.rounds_run, 3);
        assert_eq!(booster.n_rounds(), report.best_round);
    }

    #[test]
    fn invalid_stopping_rule_is_rejected() {
        assert!(matches!(
            Trainer::new(BoosterParams::default(), stopping(0, 10)),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(Trainer::new(BoosterParams::default(), stopping(5, 0)).is_err());
    }

    #[test]
    fn mismatched_eval_set_is_a_training_error() {
        let (tx, ty) = data(48, 0, false);
        let ex = DMatrix::<f64>::zeros(4, 2);
        let mut trainer = Trainer::new(BoosterParams::default(), stopping(10, 10)).unwrap();
        let err = trainer.fit_matrices(&tx, &ty, &ex, &[0.0; 4]).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }
}
