//! Error types.
//!
//! Pipeline stages return [`PipelineError`], a typed taxonomy of the ways a run
//! can fail. The binary boundary converts everything into [`AppError`], which
//! carries the process exit code:
//!
//! - `2`: input files or configuration
//! - `3`: data coverage (join fill, empty split)
//! - `4`: training / runtime / network

use chrono::NaiveDate;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Which side of the temporal split came out empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitSide {
    Train,
    Test,
}

impl std::fmt::Display for SplitSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitSide::Train => write!(f, "train"),
            SplitSide::Test => write!(f, "test"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Source format error in {file}: {message}")]
    SourceFormat { file: String, message: String },
    #[error("Exchange-rate series has no usable value for {date} even after forward/backward fill")]
    JoinCoverage { date: NaiveDate },
    #[error("The {side} partition is empty after applying the date cutoff [{test_start}, {test_end}]")]
    EmptySplit {
        side: SplitSide,
        test_start: NaiveDate,
        test_end: NaiveDate,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Training failed: {0}")]
    Training(String),
    #[error("Failed to write {what} '{path}': {message}")]
    Export {
        what: &'static str,
        path: String,
        message: String,
    },
}

impl PipelineError {
    pub fn source_format(file: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::SourceFormat {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::SourceFormat { .. } | PipelineError::InvalidConfig(_) | PipelineError::Export { .. } => 2,
            PipelineError::JoinCoverage { .. } | PipelineError::EmptySplit { .. } => 3,
            PipelineError::Training(_) => 4,
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_exit_codes() {
        let d = NaiveDate::from_ymd_opt(2018, 8, 25).unwrap();

        let err: AppError = PipelineError::source_format("x.csv", "bad").into();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "Source format error in x.csv: bad");

        let err: AppError = PipelineError::JoinCoverage { date: d }.into();
        assert_eq!(err.exit_code(), 3);

        let err: AppError = PipelineError::EmptySplit {
            side: SplitSide::Test,
            test_start: d,
            test_end: d,
        }
        .into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("test partition"));

        let err: AppError = PipelineError::Training("nan".to_string()).into();
        assert_eq!(err.exit_code(), 4);
    }
}
