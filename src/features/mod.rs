//! Feature builder: calendar features and one-hot holiday indicators.

pub mod calendar;
pub mod encode;

pub use encode::*;
