//! Dataset-level load failures.
//!
//! Individual rows never fail to load; these errors cover the cases where
//! a whole file cannot be used.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV from {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no usable columns in {path} (headers: {headers})")]
    NoUsableColumns { path: PathBuf, headers: String },
}
