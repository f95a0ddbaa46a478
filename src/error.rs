//! Error types for the spike-compare library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid spike train: {0}")]
    InvalidTrain(String),

    #[error("Empty sorting: {0}")]
    EmptySorting(String),

    #[error("Incompatible sampling context: {left} Hz vs {right} Hz")]
    IncompatibleSamplingContext { left: f64, right: f64 },

    #[error("Invalid time base: {0}")]
    InvalidTimeBase(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Duplicate unit id '{0}'")]
    DuplicateUnit(String),

    #[error("Unknown sorting '{0}'")]
    UnknownSorting(String),

    #[error("Sorting does not match correspondence table: {0}")]
    SortingMismatch(String),

    #[error("Invalid value '{value}' at row {row}: {reason}")]
    InvalidRecord {
        value: String,
        row: usize,
        reason: String,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, CompareError>;
