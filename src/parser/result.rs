use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::ingestion::ParseStats;
use crate::report::{ErrorLog, ErrorRecord};
use crate::types::CleanedRow;

/// Terminal state of one [`super::Parser`] run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    /// Rows that passed every column (or were kept under the partial policy), in source order.
    pub cleaned_data: Vec<CleanedRow>,
    pub errors: ErrorLog,
    /// `true` when a fatal error ended the run early.
    pub aborted: bool,
    pub stats: ParseStats,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    /// All error records as `(row_index, column, message)` structures.
    pub fn export(&self) -> Vec<ErrorRecord> {
        self.errors.export()
    }

    /// Error messages grouped by row index; file-level messages are keyed by `None`.
    pub fn errors_by_row(&self) -> BTreeMap<Option<usize>, Vec<String>> {
        self.errors.by_row()
    }

    /// Convert every cleaned row into `T` through its serde representation.
    ///
    /// Rows that fail to convert are left out and reported in the returned log as row-level
    /// errors. `T` sees the `row_index` field alongside the column fields.
    ///
    /// ```rust
    /// use serde::Deserialize;
    /// use tabular_import::parser::ParseResult;
    /// use tabular_import::types::{CleanedRow, Value};
    ///
    /// #[derive(Deserialize)]
    /// struct Person {
    ///     first_name: String,
    ///     age: i64,
    /// }
    ///
    /// let result = ParseResult {
    ///     cleaned_data: vec![
    ///         CleanedRow::from_pairs(1, [("first_name", Value::from("Ivan")), ("age", Value::Int64(25))]),
    ///         CleanedRow::from_pairs(2, [("first_name", Value::from("Petr")), ("age", Value::Null)]),
    ///     ],
    ///     ..Default::default()
    /// };
    /// let (people, errors) = result.deserialize_rows::<Person>();
    /// assert_eq!(people.len(), 1);
    /// assert_eq!(people[0].age, 25);
    /// assert_eq!(errors.len(), 1);
    /// ```
    pub fn deserialize_rows<T: DeserializeOwned>(&self) -> (Vec<T>, ErrorLog) {
        let mut items = Vec::with_capacity(self.cleaned_data.len());
        let mut failures = ErrorLog::new();
        for row in &self.cleaned_data {
            match serde_json::to_value(row).and_then(serde_json::from_value::<T>) {
                Ok(item) => items.push(item),
                Err(err) => failures.add(Some(row.row_index), None, err.to_string()),
            }
        }
        (items, failures)
    }
}
