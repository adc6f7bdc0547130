//! Numeric helpers shared across the pipeline.

pub mod stats;

pub use stats::*;
