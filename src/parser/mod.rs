//! The parser engine.
//!
//! A [`Parser`] owns an immutable [`Schema`], run options, optional validation hooks and an
//! optional observer. [`Parser::parse`] runs the whole lifecycle against a [`RowSource`]:
//!
//! 1. reset the previous result and open the source
//! 2. drop `skip_rows` leading rows and locate the header row (blank rows are ignored); rows
//!    after `last_row` are never read
//! 3. verify declared header labels
//! 4. run every column over each data row, then the row hook
//! 5. run the file hook over the cleaned rows
//!
//! Data-quality problems are collected into [`ParseResult::errors`] and never stop the run. A
//! source failure, a strict header mismatch, a missing header row or a stop requested by a row
//! hook aborts it: a file-level error is recorded and `cleaned_data` is left empty.
//!
//! ```rust
//! use tabular_import::ingestion::MemorySource;
//! use tabular_import::parser::Parser;
//! use tabular_import::processors::{IntegerProcessor, StringProcessor};
//! use tabular_import::schema::{Column, Schema};
//! use tabular_import::types::Value;
//!
//! let schema = Schema::new(vec![
//!     Column::new("first_name", 0, StringProcessor::new().required()).header("First Name"),
//!     Column::new("age", 1, IntegerProcessor::new().required()).header("Age"),
//! ])
//! .unwrap();
//! let source = MemorySource::from_text(vec![
//!     vec!["First Name", "Age"],
//!     vec!["Ivan", "25"],
//!     vec!["Petr", ""],
//! ]);
//!
//! let mut parser = Parser::new(schema);
//! let result = parser.parse(&source);
//! assert_eq!(result.cleaned_data.len(), 1);
//! assert_eq!(result.cleaned_data[0].get("age"), Some(&Value::Int64(25)));
//! assert_eq!(result.errors.as_slice()[0].row_index, Some(2));
//! assert!(result.has_errors());
//! ```

mod hooks;
mod options;
mod result;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::ingestion::{ParseContext, ParseObserver, ParseSeverity, ParseStats, RowSource};
use crate::processors::RowContext;
use crate::report::{ErrorKind, ErrorLog, ErrorRecord};
use crate::schema::Schema;
use crate::types::{CleanedRow, Value};

pub use hooks::{FileValidator, HookIssue, RowReview, RowValidator};
pub use options::{ParserOptions, RowFailurePolicy};
pub use result::ParseResult;

/// Schema-driven extraction and validation engine.
///
/// Cloning is cheap: the schema, hooks and observer are shared, only the result is copied.
#[derive(Clone)]
pub struct Parser {
    schema: Arc<Schema>,
    options: ParserOptions,
    row_validator: Option<Arc<dyn RowValidator>>,
    file_validator: Option<Arc<dyn FileValidator>>,
    observer: Option<Arc<dyn ParseObserver>>,
    result: ParseResult,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("columns", &self.schema.columns().len())
            .field("options", &self.options)
            .field("row_validator_set", &self.row_validator.is_some())
            .field("file_validator_set", &self.file_validator.is_some())
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// Why a run ended early. The matching error record is already in the log.
struct Abort {
    severity: ParseSeverity,
    message: String,
}

/// First-seen rows for `unique` columns and `unique_together` sets within one run.
#[derive(Debug, Default)]
struct SeenValues {
    columns: HashMap<String, HashMap<String, usize>>,
    sets: Vec<HashMap<Vec<String>, usize>>,
}

impl SeenValues {
    fn for_schema(schema: &Schema) -> Self {
        Self {
            columns: HashMap::new(),
            sets: vec![HashMap::new(); schema.unique_together().len()],
        }
    }

    /// Register `value` for `column`; returns the earlier row when it was already seen.
    fn column(&mut self, column: &str, value: &Value, row_index: usize) -> Option<usize> {
        let seen = self.columns.entry(column.to_owned()).or_default();
        first_seen(seen, value.to_string(), row_index)
    }

    fn set(&mut self, set: usize, key: Vec<String>, row_index: usize) -> Option<usize> {
        first_seen(&mut self.sets[set], key, row_index)
    }
}

fn first_seen<K: std::hash::Hash + Eq>(
    seen: &mut HashMap<K, usize>,
    key: K,
    row_index: usize,
) -> Option<usize> {
    match seen.get(&key) {
        Some(first) => Some(*first),
        None => {
            seen.insert(key, row_index);
            None
        }
    }
}

impl Parser {
    pub fn new(schema: Schema) -> Self {
        Self::from_shared(Arc::new(schema))
    }

    /// Build a parser over a schema shared with other parsers.
    pub fn from_shared(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            options: ParserOptions::default(),
            row_validator: None,
            file_validator: None,
            observer: None,
            result: ParseResult::default(),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_row_validator(mut self, validator: impl RowValidator + 'static) -> Self {
        self.row_validator = Some(Arc::new(validator));
        self
    }

    pub fn with_file_validator(mut self, validator: impl FileValidator + 'static) -> Self {
        self.file_validator = Some(Arc::new(validator));
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ParseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Run the full lifecycle against `source`, replacing any previous result.
    pub fn parse(&mut self, source: &dyn RowSource) -> &ParseResult {
        self.result = ParseResult::default();
        let ctx = ParseContext {
            source: source.describe(),
        };
        info!(source = %ctx.source, columns = self.schema.columns().len(), "parse started");

        let outcome = self.run(source);
        self.finish(&ctx, outcome)
    }

    /// Record a run whose row source could not even be built, e.g. an unknown file format.
    pub(crate) fn parse_unavailable(&mut self, locator: String, err: SourceError) -> &ParseResult {
        self.result = ParseResult::default();
        let ctx = ParseContext { source: locator };
        let outcome = Err(self.source_failure(err));
        self.finish(&ctx, outcome)
    }

    fn finish(&mut self, ctx: &ParseContext, outcome: Result<(), Abort>) -> &ParseResult {
        match &outcome {
            Ok(()) => self.validate_file(),
            Err(abort) => {
                warn!(source = %ctx.source, severity = ?abort.severity, error = %abort.message, "parse aborted");
                self.result.cleaned_data.clear();
                self.result.aborted = true;
            }
        }

        let rows = self.result.stats.rows;
        let cleaned = self.result.cleaned_data.len();
        self.result.stats = ParseStats {
            rows,
            cleaned,
            dropped: rows - cleaned,
            errors: self.result.errors.len(),
        };
        info!(
            source = %ctx.source,
            rows,
            cleaned,
            errors = self.result.stats.errors,
            "parse finished"
        );

        if let Some(observer) = &self.observer {
            match &outcome {
                Ok(()) => observer.on_success(ctx, self.result.stats),
                Err(abort) => {
                    observer.on_failure(ctx, abort.severity, &abort.message);
                    if abort.severity >= self.options.alert_at_or_above {
                        observer.on_alert(ctx, abort.severity, &abort.message);
                    }
                }
            }
        }

        &self.result
    }

    pub fn result(&self) -> &ParseResult {
        &self.result
    }

    pub fn cleaned_data(&self) -> &[CleanedRow] {
        &self.result.cleaned_data
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.result.errors
    }

    pub fn has_errors(&self) -> bool {
        self.result.has_errors()
    }

    /// Take the result of the last run, leaving an empty one behind.
    pub fn take_result(&mut self) -> ParseResult {
        std::mem::take(&mut self.result)
    }

    pub fn into_result(self) -> ParseResult {
        self.result
    }

    fn run(&mut self, source: &dyn RowSource) -> Result<(), Abort> {
        // The sequence is dropped on every return path, which closes the underlying reader.
        let rows = source.open().map_err(|err| self.source_failure(err))?;

        let mut to_skip = self.options.skip_rows;
        let mut header_pending = self.options.has_header;
        let mut seen = SeenValues::for_schema(&self.schema);
        let mut row_index = 0;
        let limit = self.options.last_row.unwrap_or(usize::MAX);

        for row in rows.take(limit) {
            let cells = row.map_err(|err| self.source_failure(err))?;
            if to_skip > 0 {
                to_skip -= 1;
                continue;
            }
            if cells.iter().all(Value::is_empty) {
                continue;
            }
            if header_pending {
                header_pending = false;
                self.verify_header(&cells)?;
                continue;
            }
            row_index += 1;
            self.result.stats.rows = row_index;
            self.process_row(row_index, &cells, &mut seen)?;
        }

        if header_pending {
            return Err(self.abort(ErrorKind::HeaderMismatch, ParseSeverity::Error, "File has no header row."));
        }
        Ok(())
    }

    fn source_failure(&mut self, err: SourceError) -> Abort {
        let severity = if err.is_io() {
            ParseSeverity::Critical
        } else {
            ParseSeverity::Error
        };
        self.abort(ErrorKind::Source, severity, err.to_string())
    }

    /// Record a file-level error and turn it into an abort.
    fn abort(&mut self, kind: ErrorKind, severity: ParseSeverity, message: impl Into<String>) -> Abort {
        let message = message.into();
        self.result
            .errors
            .push(ErrorRecord::new(kind, None, None, message.clone()));
        Abort { severity, message }
    }

    fn verify_header(&mut self, cells: &[Value]) -> Result<(), Abort> {
        if !self.options.verify_headers {
            return Ok(());
        }
        let mut mismatches = 0;
        for column in self.schema.columns() {
            let Some(expected) = column.verified_header() else {
                continue;
            };
            let actual = cells.get(column.index()).map(Value::to_string).unwrap_or_default();
            if actual.trim().to_lowercase() == expected.trim().to_lowercase() {
                continue;
            }
            warn!(column = column.name(), expected, actual = %actual, "header mismatch");
            mismatches += 1;
            self.result.errors.push(ErrorRecord::new(
                ErrorKind::HeaderMismatch,
                None,
                Some(column.name().to_owned()),
                format!(
                    "Expected header \"{expected}\" at index {}, found \"{}\".",
                    column.index(),
                    actual.trim()
                ),
            ));
        }
        if mismatches > 0 && self.options.strict_headers {
            return Err(Abort {
                severity: ParseSeverity::Error,
                message: format!("{mismatches} header label(s) do not match"),
            });
        }
        Ok(())
    }

    fn process_row(&mut self, row_index: usize, cells: &[Value], seen: &mut SeenValues) -> Result<(), Abort> {
        let ctx = RowContext::new(row_index, cells);
        let mut record = CleanedRow::new(row_index);
        let mut failed = false;

        for column in self.schema.columns() {
            match column.extract(&ctx) {
                Ok(value) => {
                    if column.is_unique() && !value.is_empty() {
                        if let Some(first) = seen.column(column.name(), &value, row_index) {
                            self.result.errors.add(
                                Some(row_index),
                                Some(column.name()),
                                format!("value {value} is a duplicate of row {first}"),
                            );
                            failed = true;
                            continue;
                        }
                    }
                    record.insert(column.name(), value);
                }
                Err(err) => {
                    self.result
                        .errors
                        .add(Some(row_index), Some(column.name()), err.message);
                    failed = true;
                }
            }
        }

        // A row that already failed never claims a combination.
        let sets = if failed { &[][..] } else { self.schema.unique_together() };
        for (set_index, names) in sets.iter().enumerate() {
            let values: Option<Vec<&Value>> = names
                .iter()
                .map(|name| record.get(name).filter(|v| !v.is_empty()))
                .collect();
            let Some(values) = values else {
                continue;
            };
            let key: Vec<String> = values.iter().map(ToString::to_string).collect();
            if let Some(first) = seen.set(set_index, key, row_index) {
                let combined: Vec<String> = names
                    .iter()
                    .zip(&values)
                    .map(|(name, value)| format!("{name} ({value})"))
                    .collect();
                self.result.errors.add(
                    Some(row_index),
                    None,
                    format!("{} is a duplicate of row {first}", combined.join(", ")),
                );
                failed = true;
            }
        }

        let dropping = self.options.row_failure_policy == RowFailurePolicy::Drop;
        if failed && dropping {
            debug!(row_index, "row dropped after column errors");
            return Ok(());
        }

        if let Some(validator) = self.row_validator.clone() {
            let review = validator.validate_row(&mut record, row_index);
            let hook_failed = !review.errors.is_empty();
            for (column, message) in review.errors {
                self.result
                    .errors
                    .push(ErrorRecord::new(ErrorKind::Hook, Some(row_index), column, message));
            }
            if let Some(message) = review.stop {
                return Err(self.abort(ErrorKind::Hook, ParseSeverity::Error, message));
            }
            if review.skip || (hook_failed && dropping) {
                debug!(row_index, skipped = review.skip, "row dropped by row validator");
                return Ok(());
            }
        }

        self.result.cleaned_data.push(record);
        Ok(())
    }

    fn validate_file(&mut self) {
        let Some(validator) = &self.file_validator else {
            return;
        };
        for issue in validator.validate_file(&self.result.cleaned_data) {
            self.result.errors.push(ErrorRecord::new(
                ErrorKind::Hook,
                issue.row_index,
                issue.column,
                issue.message,
            ));
        }
    }
}
