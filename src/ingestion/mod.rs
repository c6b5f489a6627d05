//! Row sources and run observability.
//!
//! Most callers should use [`parse_path`], [`parse_files`] or `parse_workbook` (from [`unified`]) which:
//!
//! - pick a row source by file extension (or you can override via [`SourceOptions`])
//! - run a [`crate::parser::Parser`] over it
//! - report success/failure/alerts to the parser's [`ParseObserver`], if any
//!
//! Format-specific sources are also available under:
//! - [`csv`]
//! - `excel` (feature `excel`)
//! - [`source`] (the [`RowSource`] trait and [`MemorySource`])

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod source;
pub mod unified;

pub use self::csv::{CsvOptions, CsvSource};
#[cfg(feature = "excel")]
pub use excel::ExcelSource;
pub use observability::{
    CompositeObserver, FileObserver, ParseContext, ParseObserver, ParseSeverity, ParseStats, StdErrObserver,
};
pub use source::{MemorySource, RowSequence, RowSource};
#[cfg(feature = "excel")]
pub use unified::parse_workbook;
pub use unified::{
    source_from_path, parse_files, parse_path, BatchResult, FileOutcome, IngestionFormat, SheetOutcome, SheetSelection,
    SourceOptions, WorkbookResult,
};
