//! Error types for the report pipeline.
//!
//! - [`LoadError`] - fatal input problems (missing files, unreadable
//!   tables, missing columns, bad boundary files)
//! - [`AggregateError`] - broken per-practice invariants
//! - [`PipelineError`] - top-level wrapper returned by [`crate::pipeline::run`]
//!
//! Row-level problems are not errors: the loader counts and skips them.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors while loading inputs.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Input file or directory does not exist.
    #[error("Input not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Failed to read a file.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed outside of a single row.
    #[error("Invalid CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A column the schema requires is absent from the header.
    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// Boundary file is not usable GeoJSON.
    #[error("Invalid boundary file {}: {message}", path.display())]
    Geojson { path: PathBuf, message: String },

    /// The extracts directory holds no CSV files.
    #[error("No prescription extracts (*.csv) found in {}", dir.display())]
    NoExtracts { dir: PathBuf },
}

/// Errors raised while aggregating rates.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// An attribute that must be constant per practice took two values.
    #[error("Practice {practice_id} has inconsistent {field}: '{first}' vs '{other}'")]
    InconsistentAttribute {
        practice_id: String,
        field: &'static str,
        first: String,
        other: String,
    },
}

/// Top-level pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input loading failed.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Aggregation failed.
    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;
