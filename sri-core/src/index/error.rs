//! Index construction errors.

use crate::data::provider::DataError;
use thiserror::Error;

/// A statistic that cannot be computed meaningfully on the given sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DegenerateStatistic {
    #[error("column '{column}' has zero variance")]
    ZeroVariance { column: String },

    #[error("latent factor has zero range (every value is {value})")]
    ZeroRange { value: f64 },

    #[error("loading on reference column '{column}' is zero, orientation is ambiguous")]
    ZeroReferenceLoading { column: String },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("schema mismatch: risk factor column '{column}' not found in panel")]
    SchemaMismatch { column: String },

    #[error("reference column '{column}' is not one of the selected risk factors")]
    ReferenceNotSelected { column: String },

    #[error("no risk factor columns selected")]
    NoFactors,

    #[error("risk factor matrix has {rows} rows, need at least 2")]
    TooFewRows { rows: usize },

    #[error("non-finite value in column '{column}' at row {row}")]
    NonFinite { column: String, row: usize },

    #[error("degenerate statistic: {0}")]
    Degenerate(#[from] DegenerateStatistic),

    #[error("eigen decomposition failed: {0}")]
    Decomposition(String),

    #[error("panel error: {0}")]
    Panel(#[from] DataError),
}
