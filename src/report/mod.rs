//! Reporting utilities: delay profiles, test-window comparisons and
//! formatted terminal output.

pub mod format;
pub mod profile;

pub use format::*;
pub use profile::*;
