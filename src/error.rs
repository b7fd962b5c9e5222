//! Error types for the worldlife pipeline.
//!
//! Uses `thiserror` for the library error type. Only loading and configuration can
//! fail; cleaning and aggregation steps are infallible set updates.

use crate::models::Field;

/// Top-level error type for the pipeline library.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: cannot convert {value:?} in column {field} to a number")]
    TypeConversion {
        row: u64,
        field: Field,
        value: String,
    },

    #[error("required column missing from input: {0}")]
    MissingColumn(&'static str),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("field {0} is not numeric")]
    NonNumericField(Field),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
