//! Row-level and file-level validation hooks.
//!
//! Hooks report problems by returning them, never by panicking or erroring out: the parser
//! records every returned issue and keeps going unless a row hook explicitly asks to stop.
//!
//! Closures implement both traits directly:
//!
//! ```rust
//! use tabular_import::parser::{HookIssue, RowReview};
//! use tabular_import::types::{CleanedRow, Value};
//!
//! let adults_only = |row: &mut CleanedRow, _row_index: usize| match row.get("age") {
//!     Some(Value::Int64(age)) if *age < 18 => RowReview::error(Some("age"), "must be an adult"),
//!     _ => RowReview::keep(),
//! };
//! let at_least_one = |rows: &[CleanedRow]| {
//!     if rows.is_empty() { vec![HookIssue::file("file contains no data rows")] } else { vec![] }
//! };
//! # let _ = (adults_only, at_least_one);
//! ```

use crate::types::CleanedRow;

/// One problem reported by a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookIssue {
    /// Row the issue belongs to; `None` for file-level issues.
    pub row_index: Option<usize>,
    pub column: Option<String>,
    pub message: String,
}

impl HookIssue {
    /// File-level issue.
    pub fn file(message: impl Into<String>) -> Self {
        Self {
            row_index: None,
            column: None,
            message: message.into(),
        }
    }

    /// Issue attached to a specific row (and optionally a column).
    pub fn row(row_index: usize, column: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row_index: Some(row_index),
            column: column.map(str::to_owned),
            message: message.into(),
        }
    }
}

/// Verdict of a [`RowValidator`] on one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowReview {
    /// `(column, message)` problems found in the row.
    pub errors: Vec<(Option<String>, String)>,
    /// Leave the row out of `cleaned_data` even without errors.
    pub skip: bool,
    /// Abort the whole run with this message.
    pub stop: Option<String>,
}

impl RowReview {
    /// Accept the row as is.
    pub fn keep() -> Self {
        Self::default()
    }

    /// Silently exclude the row.
    pub fn skip() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }

    /// Report a single problem.
    pub fn error(column: Option<&str>, message: impl Into<String>) -> Self {
        Self::default().with_error(column, message)
    }

    /// Abort parsing the file.
    pub fn stop(message: impl Into<String>) -> Self {
        Self {
            stop: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, column: Option<&str>, message: impl Into<String>) -> Self {
        self.errors.push((column.map(str::to_owned), message.into()));
        self
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.skip && self.stop.is_none()
    }
}

/// Row-level hook, run on every assembled record that survived column extraction.
///
/// The record may be modified in place; the modified record is what ends up in `cleaned_data`.
pub trait RowValidator: Send + Sync {
    fn validate_row(&self, record: &mut CleanedRow, row_index: usize) -> RowReview;
}

impl<F> RowValidator for F
where
    F: Fn(&mut CleanedRow, usize) -> RowReview + Send + Sync,
{
    fn validate_row(&self, record: &mut CleanedRow, row_index: usize) -> RowReview {
        self(record, row_index)
    }
}

/// File-level hook, run once over all cleaned rows after iteration.
///
/// Read-only: it can report issues but cannot change emitted rows.
pub trait FileValidator: Send + Sync {
    fn validate_file(&self, records: &[CleanedRow]) -> Vec<HookIssue>;
}

impl<F> FileValidator for F
where
    F: Fn(&[CleanedRow]) -> Vec<HookIssue> + Send + Sync,
{
    fn validate_file(&self, records: &[CleanedRow]) -> Vec<HookIssue> {
        self(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_builders() {
        assert!(RowReview::keep().is_clean());
        assert!(RowReview::skip().skip);
        let r = RowReview::error(Some("a"), "bad").with_error(None, "worse");
        assert_eq!(
            r.errors,
            vec![(Some("a".to_string()), "bad".to_string()), (None, "worse".to_string())]
        );
        assert_eq!(RowReview::stop("halt").stop.as_deref(), Some("halt"));
    }

    #[test]
    fn closures_are_validators() {
        let hook = |row: &mut CleanedRow, _idx: usize| {
            row.insert("seen", true.into());
            RowReview::keep()
        };
        let mut row = CleanedRow::new(1);
        assert!(hook.validate_row(&mut row, 1).is_clean());
        assert!(row.contains("seen"));

        let file_hook = |rows: &[CleanedRow]| vec![HookIssue::file(format!("{} rows", rows.len()))];
        assert_eq!(file_hook.validate_file(&[row])[0].message, "1 rows");
    }
}
