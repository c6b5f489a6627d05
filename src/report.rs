//! Error aggregation and report export.
//!
//! The parser never stops for data-quality problems; every problem becomes an [`ErrorRecord`]
//! appended to an [`ErrorLog`] in encounter order. The log can be exported as structured records
//! (`row_index`, `column`, `message`) or written straight to a CSV/JSON report.

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::ReportResult;

/// Where an error record came from. Not part of the export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The row source could not be opened or read.
    Source,
    /// A declared header label did not match the file, or no header row exists.
    HeaderMismatch,
    /// A processor or column rule rejected a cell.
    Validation,
    /// A row or file validation hook reported a problem.
    Hook,
}

/// One collected error. `row_index == None` marks a file-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub row_index: Option<usize>,
    pub column: Option<String>,
    pub message: String,
    #[serde(skip, default = "default_kind")]
    pub kind: ErrorKind,
}

fn default_kind() -> ErrorKind {
    ErrorKind::Validation
}

impl ErrorRecord {
    pub fn new(
        kind: ErrorKind,
        row_index: Option<usize>,
        column: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            column,
            message: message.into(),
            kind,
        }
    }

    pub fn is_file_level(&self) -> bool {
        self.row_index.is_none()
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(row) = self.row_index {
            write!(f, "row: {row}, ")?;
        }
        if let Some(column) = &self.column {
            write!(f, "column: {column}, ")?;
        }
        f.write_str(&self.message)
    }
}

/// Ordered, append-only collection of [`ErrorRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validation error.
    pub fn add(&mut self, row_index: Option<usize>, column: Option<&str>, message: impl Into<String>) {
        self.push(ErrorRecord::new(
            ErrorKind::Validation,
            row_index,
            column.map(str::to_owned),
            message,
        ));
    }

    pub fn push(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    pub fn has_errors(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[ErrorRecord] {
        &self.records
    }

    /// Copy of all records, in encounter order.
    pub fn export(&self) -> Vec<ErrorRecord> {
        self.records.clone()
    }

    /// Messages grouped by row; file-level messages are under `None`.
    pub fn by_row(&self) -> BTreeMap<Option<usize>, Vec<String>> {
        let mut out: BTreeMap<Option<usize>, Vec<String>> = BTreeMap::new();
        for r in &self.records {
            out.entry(r.row_index).or_default().push(r.message.clone());
        }
        out
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    /// Write a `row_index,column,message` CSV report with a header line.
    pub fn write_csv_report<W: Write>(&self, writer: W) -> ReportResult<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
        if self.records.is_empty() {
            wtr.write_record(["row_index", "column", "message"])?;
        }
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Serialize the records as a JSON array.
    pub fn to_json(&self) -> ReportResult<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }
}

impl<'a> IntoIterator for &'a ErrorLog {
    type Item = &'a ErrorRecord;
    type IntoIter = std::slice::Iter<'a, ErrorRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_errors_tracks_emptiness() {
        let mut log = ErrorLog::new();
        assert!(!log.has_errors());
        log.add(Some(0), Some("age"), "Error");
        assert!(log.has_errors());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn display_prefixes_row_and_column() {
        let mut log = ErrorLog::new();
        log.add(None, None, "Error text");
        log.add(Some(2), Some("age"), "Error text");
        let rendered: Vec<String> = log.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Error text", "row: 2, column: age, Error text"]);
    }

    #[test]
    fn export_keeps_order_and_duplicates() {
        let mut log = ErrorLog::new();
        log.add(Some(1), Some("a"), "x");
        log.add(Some(1), Some("a"), "x");
        log.add(None, None, "file");
        let exported = log.export();
        assert_eq!(exported.len(), 3);
        assert_eq!(exported[0], exported[1]);
        assert!(exported[2].is_file_level());
    }

    #[test]
    fn by_row_groups_messages() {
        let mut log = ErrorLog::new();
        log.add(Some(2), Some("a"), "first");
        log.add(None, None, "file");
        log.add(Some(2), Some("b"), "second");
        let grouped = log.by_row();
        assert_eq!(grouped[&Some(2)], vec!["first", "second"]);
        assert_eq!(grouped[&None], vec!["file"]);
    }

    #[test]
    fn csv_report_has_three_columns() {
        let mut log = ErrorLog::new();
        log.add(Some(2), Some("age"), "value is required");
        log.add(None, None, "bad, header");

        let mut buf = Vec::new();
        log.write_csv_report(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "row_index,column,message\n2,age,value is required\n,,\"bad, header\"\n"
        );
    }

    #[test]
    fn empty_csv_report_still_has_header() {
        let mut buf = Vec::new();
        ErrorLog::new().write_csv_report(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "row_index,column,message\n");
    }

    #[test]
    fn json_report_field_order() {
        let mut log = ErrorLog::new();
        log.add(Some(1), None, "m");
        let json = log.to_json().unwrap();
        let row_pos = json.find("row_index").unwrap();
        let col_pos = json.find("column").unwrap();
        let msg_pos = json.find("message").unwrap();
        assert!(row_pos < col_pos && col_pos < msg_pos);
        assert!(!json.contains("kind"));
    }
}
