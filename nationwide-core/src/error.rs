//! Error taxonomy for the failures the pipeline branches on
//!
//! Plain I/O, zip and XML failures travel as `anyhow::Error` with context;
//! the types here exist because callers react to them differently.

use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The location directory cache could not be used.
///
/// Always recoverable by rebuilding from the reference workbook.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("location cache not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("location cache {} is unreadable: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("location cache {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// The location directory could not be rebuilt. Fatal for the run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read reference workbook {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("reference workbook {} has no usable data rows", .0.display())]
    NoDataRows(PathBuf),

    #[error("failed to persist location cache {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// The unresolved-code ledger could not be appended to.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to open ledger {} for append: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write ledger {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A data row too short to cover every referenced column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row} has {len} cells, at least {required} required")]
pub struct MalformedRowError {
    /// 1-based spreadsheet row number
    pub row: usize,
    pub len: usize,
    pub required: usize,
}
