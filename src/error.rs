use thiserror::Error;

/// Convenience result type for row source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience result type for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Convenience result type for report writers.
pub type ReportResult<T> = Result<T, ReportError>;

/// Error returned by row sources when a file cannot be opened or read.
///
/// The parser never returns this to callers; it becomes a single file-level
/// error record and ends the run.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    /// Workbook reader error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// The source exists but its shape is unusable (unknown format, missing sheet, ...).
    #[error("invalid source: {message}")]
    Format { message: String },
}

impl SourceError {
    /// Returns `true` when the failure originates from the filesystem or OS.
    pub fn is_io(&self) -> bool {
        match self {
            SourceError::Io(_) => true,
            SourceError::Csv(err) => matches!(err.kind(), csv::ErrorKind::Io(_)),
            #[cfg(feature = "excel")]
            SourceError::Excel(calamine::Error::Io(_)) => true,
            _ => false,
        }
    }
}

/// Programmer errors detected while a schema is being built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no columns")]
    EmptySchema,

    #[error("column name '{name}' is declared more than once")]
    DuplicateColumn { name: String },

    #[error("column name '{name}' does not match the pattern [a-z][a-z0-9_]*")]
    InvalidColumnName { name: String },

    #[error("column name '{name}' is reserved")]
    ReservedColumnName { name: String },

    #[error("unique-together set references unknown column '{name}'")]
    UnknownColumn { name: String },
}

/// Failure signal of a [`crate::processors::Processor`].
///
/// Carries the user-facing message only; the engine adds the row and column.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error raised while loading [`crate::parser::ParserOptions`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parser options: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error raised while writing an error report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
