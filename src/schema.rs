//! Column declarations and the immutable schema built from them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{SchemaError, SchemaResult, ValidationError};
use crate::processors::{Processor, RawProcessor, RowContext};
use crate::types::Value;

/// Field name every [`crate::types::CleanedRow`] carries implicitly.
pub const ROW_INDEX_FIELD: &str = "row_index";

/// Field carrying the worksheet title of rows read by [`crate::ingestion::parse_workbook`].
pub const WORKSHEET_FIELD: &str = "worksheet";

static MISSING_CELL: Value = Value::Null;

/// Binds a target field name to a source position and a [`Processor`].
#[derive(Clone)]
pub struct Column {
    name: String,
    index: usize,
    header: Option<String>,
    validate_header: bool,
    processor: Arc<dyn Processor>,
    required: bool,
    default: Option<Value>,
    unique: bool,
    allow_missing: bool,
}

impl Column {
    /// Column at `index` processed by `processor`.
    pub fn new(name: impl Into<String>, index: usize, processor: impl Processor + 'static) -> Self {
        Self {
            name: name.into(),
            index,
            header: None,
            validate_header: true,
            processor: Arc::new(processor),
            required: false,
            default: None,
            unique: false,
            allow_missing: false,
        }
    }

    /// Column whose values pass through a [`RawProcessor`].
    pub fn raw(name: impl Into<String>, index: usize) -> Self {
        Self::new(name, index, RawProcessor::new())
    }

    /// Expected header label, compared trimmed and case-insensitively.
    pub fn header(mut self, label: impl Into<String>) -> Self {
        self.header = Some(label.into());
        self
    }

    /// Keep the header label for messages but exclude it from verification.
    pub fn skip_header_check(mut self) -> Self {
        self.validate_header = false;
        self
    }

    /// Fail rows whose processed value is empty.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Use `default` when the processed value is empty.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Reject values already seen in an earlier row.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Treat an index past the end of the row as an empty cell instead of an error.
    pub fn allow_missing(mut self) -> Self {
        self.allow_missing = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn header_label(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// The label to verify against the header row, if any.
    pub fn verified_header(&self) -> Option<&str> {
        if self.validate_header {
            self.header.as_deref()
        } else {
            None
        }
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Name used in user-facing messages: the header label when declared.
    pub fn display_name(&self) -> &str {
        self.header.as_deref().unwrap_or(&self.name)
    }

    /// Pull this column's cell out of the row and run the processor.
    pub fn extract(&self, ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        let raw = match ctx.cell(self.index) {
            Some(v) => v,
            None if self.allow_missing => &MISSING_CELL,
            None => {
                return Err(ValidationError::new(format!(
                    "Missing column at index {}.",
                    self.index
                )));
            }
        };

        let value = self.processor.process(raw, ctx)?;
        if !value.is_empty() {
            return Ok(value);
        }
        match (&self.default, self.required) {
            (Some(default), _) => Ok(default.clone()),
            (None, true) => Err(ValidationError::new(format!(
                "Column {} is required.",
                self.display_name()
            ))),
            (None, false) => Ok(value),
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("header", &self.header)
            .field("validate_header", &self.validate_header)
            .field("processor", &self.processor)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("unique", &self.unique)
            .field("allow_missing", &self.allow_missing)
            .finish()
    }
}

/// Ordered, validated list of [`Column`]s.
///
/// Construction fails on programmer errors: duplicate, reserved or malformed names.
///
/// ```rust
/// use tabular_import::processors::{IntegerProcessor, StringProcessor};
/// use tabular_import::schema::{Column, Schema};
///
/// let schema = Schema::new(vec![
///     Column::new("first_name", 0, StringProcessor::new().required()).header("First Name"),
///     Column::new("age", 1, IntegerProcessor::new().required()).header("Age"),
/// ])
/// .unwrap();
/// assert_eq!(schema.column_names().collect::<Vec<_>>(), vec!["first_name", "age"]);
///
/// let dup = Schema::new(vec![Column::raw("a", 0), Column::raw("a", 1)]);
/// assert!(dup.is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
    unique_together: Vec<Vec<String>>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> SchemaResult<Self> {
        if columns.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        let mut seen = HashSet::new();
        for column in &columns {
            validate_column_name(column.name())?;
            if !seen.insert(column.name()) {
                return Err(SchemaError::DuplicateColumn {
                    name: column.name().to_owned(),
                });
            }
        }
        Ok(Self {
            columns,
            unique_together: Vec::new(),
        })
    }

    /// Require the combination of `names` to be unique across rows.
    pub fn with_unique_together<I>(mut self, names: I) -> SchemaResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let set: Vec<String> = names.into_iter().map(Into::into).collect();
        for name in &set {
            if self.column(name).is_none() {
                return Err(SchemaError::UnknownColumn { name: name.clone() });
            }
        }
        self.unique_together.push(set);
        Ok(self)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    pub fn unique_together(&self) -> &[Vec<String>] {
        &self.unique_together
    }

    /// `true` when at least one column declares a header label to verify.
    pub fn has_verified_headers(&self) -> bool {
        self.columns.iter().any(|c| c.verified_header().is_some())
    }
}

fn validate_column_name(name: &str) -> SchemaResult<()> {
    if name == ROW_INDEX_FIELD || name == WORKSHEET_FIELD {
        return Err(SchemaError::ReservedColumnName { name: name.to_owned() });
    }
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidColumnName { name: name.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::{IntegerProcessor, StringProcessor};

    #[test]
    fn column_name_pattern() {
        for ok in ["a", "name", "column_name", "column_name1"] {
            assert!(Schema::new(vec![Column::raw(ok, 0)]).is_ok(), "{ok}");
        }
        for bad in ["", "1", "_name", "NaMe", "na-me"] {
            assert_eq!(
                Schema::new(vec![Column::raw(bad, 0)]).unwrap_err(),
                SchemaError::InvalidColumnName { name: bad.to_owned() }
            );
        }
    }

    #[test]
    fn schema_rejects_duplicates_reserved_and_empty() {
        assert_eq!(
            Schema::new(vec![Column::raw("a", 0), Column::raw("a", 1)]).unwrap_err(),
            SchemaError::DuplicateColumn { name: "a".to_owned() }
        );
        assert_eq!(
            Schema::new(vec![Column::raw("row_index", 0)]).unwrap_err(),
            SchemaError::ReservedColumnName { name: "row_index".to_owned() }
        );
        assert_eq!(
            Schema::new(vec![Column::raw("worksheet", 0)]).unwrap_err(),
            SchemaError::ReservedColumnName { name: "worksheet".to_owned() }
        );
        assert_eq!(Schema::new(vec![]).unwrap_err(), SchemaError::EmptySchema);
    }

    #[test]
    fn unique_together_must_reference_columns() {
        let schema = Schema::new(vec![Column::raw("a", 0), Column::raw("b", 1)]).unwrap();
        assert!(schema.clone().with_unique_together(["a", "b"]).is_ok());
        assert_eq!(
            schema.with_unique_together(["a", "c"]).unwrap_err(),
            SchemaError::UnknownColumn { name: "c".to_owned() }
        );
    }

    #[test]
    fn extract_reports_missing_index() {
        let cells = vec![Value::text("x")];
        let ctx = RowContext::new(1, &cells);
        let err = Column::raw("b", 3).extract(&ctx).unwrap_err();
        assert_eq!(err.message, "Missing column at index 3.");
        assert_eq!(Column::raw("b", 3).allow_missing().extract(&ctx).unwrap(), Value::Null);
    }

    #[test]
    fn extract_applies_column_default_and_required() {
        let cells = vec![Value::text("  ")];
        let ctx = RowContext::new(1, &cells);

        let with_default = Column::new("n", 0, IntegerProcessor::new()).with_default(3_i64);
        assert_eq!(with_default.extract(&ctx).unwrap(), Value::Int64(3));

        let required = Column::new("n", 0, StringProcessor::new())
            .header("Custom Name")
            .required();
        assert_eq!(
            required.extract(&ctx).unwrap_err().message,
            "Column Custom Name is required."
        );
    }

    #[test]
    fn skip_header_check_hides_label_from_verification() {
        let col = Column::raw("a", 0).header("A").skip_header_check();
        assert_eq!(col.header_label(), Some("A"));
        assert_eq!(col.verified_header(), None);
    }
}
