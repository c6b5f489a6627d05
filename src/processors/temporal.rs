use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ValidationError;
use crate::types::Value;

use super::{EmptyPolicy, Processor, RowContext, empty_policy_builders};

/// Parses text against `formats` (chrono `strftime` syntax), first match wins.
///
/// Each format is tried as a date-time first, then as a date, so `"%d.%m.%Y %H:%M:%S"` and
/// `"%d.%m.%Y"` can be mixed freely.
fn parse_with_formats(raw: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    formats.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt).ok().or_else(|| {
            NaiveDate::parse_from_str(raw, fmt)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
    })
}

fn coerce_datetime(v: &Value, formats: &[String]) -> Result<NaiveDateTime, ValidationError> {
    match v {
        Value::DateTime(dt) => Ok(*dt),
        Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
        Value::Utf8(s) => parse_with_formats(s, formats).ok_or_else(|| {
            ValidationError::new(format!(
                "Value \"{}\" does not match the formats {formats:?}",
                s.trim()
            ))
        }),
        other => Err(ValidationError::new(format!("Cannot convert {other} to a date"))),
    }
}

/// Parses a calendar date, yielding [`Value::Date`].
///
/// Native spreadsheet dates pass through; date-times are truncated to their date.
#[derive(Debug, Clone)]
pub struct DateProcessor {
    formats: Vec<String>,
    empty: EmptyPolicy,
}

impl DateProcessor {
    pub fn new<I>(formats: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
            empty: EmptyPolicy::default(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }
}

empty_policy_builders!(DateProcessor);

impl Processor for DateProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty
            .apply(value, |v| coerce_datetime(v, &self.formats).map(|dt| Value::Date(dt.date())))
    }
}

/// Parses a date with time of day, yielding [`Value::DateTime`].
///
/// Date-only matches are placed at midnight.
#[derive(Debug, Clone)]
pub struct DateTimeProcessor {
    formats: Vec<String>,
    empty: EmptyPolicy,
}

impl DateTimeProcessor {
    pub fn new<I>(formats: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
            empty: EmptyPolicy::default(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }
}

empty_policy_builders!(DateTimeProcessor);

impl Processor for DateTimeProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty
            .apply(value, |v| coerce_datetime(v, &self.formats).map(Value::DateTime))
    }
}
