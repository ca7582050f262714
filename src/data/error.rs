use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a table from a source. Fatal: the source is static,
/// so nothing is retried.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("parsing JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reading parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("reading arrow batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("source is missing expected column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("column '{column}' has unsupported type {ty}")]
    UnsupportedType { column: String, ty: String },

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
}

/// Failure of a filter or aggregate over a loaded table. Both variants
/// point at a mismatch between the caller and the schema, never at the data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{0}' is not numeric")]
    NotNumeric(String),
}
