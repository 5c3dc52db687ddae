use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Load-time errors
// ---------------------------------------------------------------------------

/// Fatal failures while turning a source file into a [`Dataset`].
///
/// Everything that can go wrong *after* a dataset is loaded (absent values,
/// missing optional columns, empty filter results) is modelled as data, not
/// as an error.
///
/// [`Dataset`]: crate::data::model::Dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The source does not exist or cannot be read.
    #[error("dataset '{}' not found or unreadable: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source was readable but its content is not a valid table.
    #[error("failed to parse dataset '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("unsupported dataset format '.{extension}' for '{}'", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },
}

impl DatasetError {
    pub(crate) fn not_found(path: &Path, source: std::io::Error) -> Self {
        DatasetError::NotFound {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, source: impl Into<ParseError>) -> Self {
        DatasetError::Parse {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    /// Whether this is the "source missing or unreadable" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatasetError::NotFound { .. })
    }

    /// The source path the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            DatasetError::NotFound { path, .. }
            | DatasetError::Parse { path, .. }
            | DatasetError::UnsupportedFormat { path, .. } => path,
        }
    }
}

/// Why a readable source could not be turned into a table.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing header row")]
    MissingHeader,

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("row {row}: expected {expected} fields, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column '{column}' must be numeric, found '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("{0}")]
    Malformed(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

pub type Result<T, E = DatasetError> = std::result::Result<T, E>;
