//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - source records (`WaitTimeObservation`, `ExchangeRateRecord`, `HolidayRecord`)
//! - the joined per-hour row (`JoinedRow`)
//! - run configuration (`PipelineConfig`, `DateWindow`, `StoppingRule`)

pub mod types;

pub use types::*;
