//! `border-wait` library crate.
//!
//! The binary (`bwt`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the join, feature and boosting stages can be reused on other crossings
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod boost;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod features;
pub mod forecast;
pub mod io;
pub mod join;
pub mod math;
pub mod plot;
pub mod report;
pub mod split;
