//! Terminal plots.

pub mod ascii;

pub use ascii::{render_day, render_profile, render_series, render_yearly_rate};
