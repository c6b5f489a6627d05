//! `tabular-import` reads CSV and spreadsheet files against a declarative column [`schema::Schema`],
//! coercing and validating every cell and collecting every problem instead of failing fast.
//!
//! The primary entrypoint is [`parser::Parser::parse`], which runs one full pass over a
//! [`ingestion::RowSource`]. For files on disk, [`ingestion::parse_path`] picks the source from the
//! file extension and [`ingestion::parse_files`] handles a whole directory.
//!
//! ## What you can read
//!
//! - **CSV / TSV**: `.csv`, `.tsv` (every cell arrives as text)
//! - **Workbooks** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!   (numbers, booleans and dates keep their native types)
//! - **In-memory rows** through [`ingestion::MemorySource`]
//!
//! ## Quick example
//!
//! ```rust
//! use tabular_import::ingestion::CsvSource;
//! use tabular_import::parser::{Parser, RowReview};
//! use tabular_import::processors::{ChoiceProcessor, DateProcessor, IntegerProcessor, StringProcessor};
//! use tabular_import::schema::{Column, Schema};
//! use tabular_import::types::{CleanedRow, Value};
//!
//! let schema = Schema::new(vec![
//!     Column::new("name", 0, StringProcessor::new().required()).header("Name"),
//!     Column::new("age", 1, IntegerProcessor::new().required()).header("Age"),
//!     Column::new("team", 2, ChoiceProcessor::new(["red", "blue"])).header("Team"),
//!     Column::new("joined", 3, DateProcessor::new(["%Y-%m-%d", "%d/%m/%Y"])).header("Joined"),
//! ])
//! .unwrap();
//!
//! let csv = "Name,Age,Team,Joined\nAda,36,red,2020-01-31\nBob,seven,blue,31/01/2020\n,,,\nEve,17,red,\n";
//! let mut parser = Parser::new(schema).with_row_validator(|row: &mut CleanedRow, _idx: usize| {
//!     match row.get("age") {
//!         Some(Value::Int64(age)) if *age < 18 => RowReview::error(Some("age"), "must be an adult"),
//!         _ => RowReview::keep(),
//!     }
//! });
//!
//! let result = parser.parse(&CsvSource::from_bytes(csv));
//! assert_eq!(result.cleaned_data.len(), 1);
//! assert_eq!(result.cleaned_data[0].get("name"), Some(&Value::text("Ada")));
//!
//! let messages: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
//! assert_eq!(
//!     messages,
//!     vec!["row: 2, column: age, seven is not an integer.", "row: 3, column: age, must be an adult"]
//! );
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: column declarations and schema validation
//! - [`processors`]: per-cell coercion and validation rules
//! - [`parser`]: the engine, its options, hooks and result
//! - [`report`]: error records and CSV/JSON export
//! - [`ingestion`]: row sources, path entrypoints and observers
//! - [`types`]: raw/cleaned values and cleaned rows
//! - [`error`]: error types used across the crate

pub mod error;
pub mod ingestion;
pub mod parser;
pub mod processors;
pub mod report;
pub mod schema;
pub mod types;

pub use error::{ConfigError, ReportError, SchemaError, SourceError, SourceResult, ValidationError};
pub use parser::{ParseResult, Parser, ParserOptions, RowFailurePolicy};
pub use report::{ErrorLog, ErrorRecord};
pub use schema::{Column, Schema};
pub use types::{CleanedRow, Value};
