//! Input validation errors.
//!
//! The redistribution itself has no failure modes; only loading the tables of
//! one time resolution can fail, which aborts that resolution's run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for input loading.
pub type Result<T> = std::result::Result<T, InputError>;

/// Errors raised while loading the tables of one resolution.
#[derive(Debug, Error)]
pub enum InputError {
    /// The file could not be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing column, malformed value or ragged row.
    #[error("invalid table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Energy, curtailment and capacity values must be finite and non-negative.
    #[error("invalid {field} {value} for generator {generator} in {}", path.display())]
    InvalidValue {
        path: PathBuf,
        generator: String,
        field: &'static str,
        value: f64,
    },

    /// Input tables must be `.csv` files.
    #[error("unsupported file type {}, expected .csv", path.display())]
    UnsupportedExtension { path: PathBuf },

    /// A dispatch table does not belong to the resolution it was given for.
    #[error(
        "file {} does not carry the `_{suffix}` suffix of resolution {resolution}",
        path.display()
    )]
    UnexpectedSuffix {
        path: PathBuf,
        suffix: String,
        resolution: String,
    },
}
