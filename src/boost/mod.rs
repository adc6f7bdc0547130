//! Gradient-boosted regression trees, delegated to XGBoost.
//!
//! [`BoosterParams`] is the fixed configuration (squared error, eta, depth,
//! row/column subsampling, `lambda`, `gamma`, min child weight, seed) mapped
//! onto the library's parameter builders. [`BoostingSession`] adds one tree
//! per call so stopping policy can live with the caller (see `forecast`).

pub mod booster;
pub mod params;

pub use booster::{Booster, BoostingSession, FeatureImportance, importance_from_dump};
pub use params::BoosterParams;
