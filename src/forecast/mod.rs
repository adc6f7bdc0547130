//! Wait-time forecast model: early-stopped training and prediction.
//!
//! Lifecycle:
//!
//! ```text
//! Untrained -> Training -> Trained(EarlyStopped | RoundCap) -> predict
//! ```
//!
//! The model kept after training is the one from the best evaluation round;
//! trees fitted after it are discarded.

pub mod model;
pub mod trainer;

pub use model::{ForecastModel, ModelCard};
pub use trainer::{Convergence, RoundMetrics, Trainer, TrainerState, TrainingReport};
