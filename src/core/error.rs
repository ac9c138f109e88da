//! Domain error types for the trend pipeline.

use std::path::PathBuf;

/// Errors raised while fetching, parsing or analysing a price series.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error("retrieval failed for {symbol}: {reason}")]
    Retrieval { symbol: String, reason: String },

    #[error("storage error at {}: {reason}", .path.display())]
    Storage { path: PathBuf, reason: String },

    #[error("raw table not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("parse error in {} at row {row}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("insufficient data for {what}: have {have}, need {need}")]
    InsufficientData {
        what: String,
        have: usize,
        need: usize,
    },

    #[error("both samples have zero variance but different means")]
    DegenerateVariance,

    #[error("invalid t distribution: {0}")]
    Distribution(String),
}

impl TrendError {
    pub fn insufficient(what: impl Into<String>, have: usize, need: usize) -> Self {
        TrendError::InsufficientData {
            what: what.into(),
            have,
            need,
        }
    }
}
