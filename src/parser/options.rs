use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ingestion::ParseSeverity;

/// What happens to a row when one of its columns fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFailurePolicy {
    /// Leave the row out of `cleaned_data`; its errors are still recorded.
    #[default]
    Drop,
    /// Keep the successfully extracted fields (plus `row_index`).
    Partial,
}

/// Options controlling a [`super::Parser`] run.
///
/// Use [`Default`] for common cases, or load from JSON:
///
/// ```rust
/// use tabular_import::parser::{ParserOptions, RowFailurePolicy};
///
/// let opts = ParserOptions::from_json_str(r#"{"skip_rows": 2, "row_failure_policy": "partial"}"#).unwrap();
/// assert_eq!(opts.skip_rows, 2);
/// assert_eq!(opts.row_failure_policy, RowFailurePolicy::Partial);
/// assert!(opts.has_header);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Leading source rows ignored before looking for the header.
    pub skip_rows: usize,
    /// 1-based position of the last source row read, counting skipped, blank and header rows.
    /// Later rows (footers, totals) are never read.
    pub last_row: Option<usize>,
    /// The first non-blank row after `skip_rows` is a header row.
    pub has_header: bool,
    /// Compare declared column header labels against the header row.
    pub verify_headers: bool,
    /// Abort the run on any header mismatch instead of recording a warning.
    pub strict_headers: bool,
    /// Row handling when a column fails.
    pub row_failure_policy: RowFailurePolicy,
    /// Severity threshold at which an observer's `on_alert` is invoked.
    pub alert_at_or_above: ParseSeverity,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            skip_rows: 0,
            last_row: None,
            has_header: true,
            verify_headers: true,
            strict_headers: false,
            row_failure_policy: RowFailurePolicy::Drop,
            alert_at_or_above: ParseSeverity::Critical,
        }
    }
}

impl ParserOptions {
    /// Parse options from a JSON object; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
