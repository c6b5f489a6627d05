use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::error::ValidationError;
use crate::types::Value;

use super::{EmptyPolicy, Processor, RowContext, empty_policy_builders};

/// Coerces native numbers and numeric text to [`Value::Int64`].
///
/// Floats are accepted only when they have no fractional part (spreadsheets store every number
/// as a float); text is trimmed first, so `"  10  "` and `"10.0"` both yield `10`.
#[derive(Debug, Clone, Default)]
pub struct IntegerProcessor {
    empty: EmptyPolicy,
}

impl IntegerProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

empty_policy_builders!(IntegerProcessor);

impl Processor for IntegerProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty.apply(value, |v| {
            let parsed = match v {
                Value::Int64(i) => Some(*i),
                Value::Float64(f) => float_to_i64(*f),
                Value::Utf8(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
                }
                _ => None,
            };
            parsed
                .map(Value::Int64)
                .ok_or_else(|| ValidationError::new(format!("{v} is not an integer.")))
        })
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Coerces native numbers and numeric text to [`Value::Float64`].
///
/// A comma is accepted as the decimal separator (`"123,22"` -> `123.22`). Non-finite results
/// (`inf`, `NaN`) are rejected.
#[derive(Debug, Clone, Default)]
pub struct FloatProcessor {
    empty: EmptyPolicy,
}

impl FloatProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

empty_policy_builders!(FloatProcessor);

impl Processor for FloatProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty.apply(value, |v| {
            let parsed = match v {
                Value::Float64(f) => Some(*f),
                Value::Int64(i) => Some(*i as f64),
                Value::Utf8(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
                _ => None,
            };
            match parsed {
                Some(f) if f.is_finite() => Ok(Value::Float64(f)),
                _ => Err(ValidationError::new(format!("{v} is not a floating point number."))),
            }
        })
    }
}

/// Coerces native numbers and numeric text to an exact [`Value::Decimal`].
///
/// Text keeps its written scale (`"12,50"` -> `12.50`); a comma is accepted as the decimal
/// separator and exponent notation is accepted too.
#[derive(Debug, Clone, Default)]
pub struct DecimalProcessor {
    empty: EmptyPolicy,
}

impl DecimalProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

empty_policy_builders!(DecimalProcessor);

impl Processor for DecimalProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty.apply(value, |v| {
            let parsed = match v {
                Value::Decimal(d) => Some(*d),
                Value::Int64(i) => Some(Decimal::from(*i)),
                Value::Float64(f) => Decimal::from_f64(*f),
                Value::Utf8(s) => {
                    let s = s.trim().replace(',', ".");
                    Decimal::from_str(&s).or_else(|_| Decimal::from_scientific(&s)).ok()
                }
                _ => None,
            };
            parsed
                .map(Value::Decimal)
                .ok_or_else(|| ValidationError::new(format!("{v} is not a decimal number.")))
        })
    }
}

/// Maps native booleans, `1`/`0` and configurable words to [`Value::Bool`].
#[derive(Debug, Clone)]
pub struct BooleanProcessor {
    true_values: Vec<String>,
    false_values: Vec<String>,
    empty: EmptyPolicy,
}

impl Default for BooleanProcessor {
    fn default() -> Self {
        Self {
            true_values: ["true", "t", "1", "yes", "y"].map(String::from).to_vec(),
            false_values: ["false", "f", "0", "no", "n"].map(String::from).to_vec(),
            empty: EmptyPolicy::default(),
        }
    }
}

impl BooleanProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accepted words. Matching is case-insensitive.
    pub fn with_values<T, F>(mut self, true_values: T, false_values: F) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        self.true_values = true_values.into_iter().map(Into::into).collect();
        self.false_values = false_values.into_iter().map(Into::into).collect();
        self
    }

    fn parse_text(&self, s: &str) -> Option<bool> {
        let s = s.trim();
        if self.true_values.iter().any(|t| t.eq_ignore_ascii_case(s)) {
            Some(true)
        } else if self.false_values.iter().any(|f| f.eq_ignore_ascii_case(s)) {
            Some(false)
        } else {
            None
        }
    }
}

empty_policy_builders!(BooleanProcessor);

impl Processor for BooleanProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty.apply(value, |v| {
            let parsed = match v {
                Value::Bool(b) => Some(*b),
                Value::Int64(1) => Some(true),
                Value::Int64(0) => Some(false),
                Value::Float64(f) if *f == 1.0 => Some(true),
                Value::Float64(f) if *f == 0.0 => Some(false),
                Value::Utf8(s) => self.parse_text(s),
                _ => None,
            };
            parsed.map(Value::Bool).ok_or_else(|| {
                let expected: Vec<&str> = self
                    .true_values
                    .iter()
                    .chain(self.false_values.iter())
                    .map(String::as_str)
                    .collect();
                ValidationError::new(format!("Expected one of the values: {expected:?}"))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ctx() -> RowContext<'static> {
        RowContext::detached(1)
    }

    #[test]
    fn integer_accepts_native_and_text() {
        let p = IntegerProcessor::new();
        assert_eq!(p.process(&Value::Null, &ctx()).unwrap(), Value::Null);
        assert_eq!(p.process(&Value::Int64(10), &ctx()).unwrap(), Value::Int64(10));
        assert_eq!(p.process(&Value::Float64(10.0), &ctx()).unwrap(), Value::Int64(10));
        assert_eq!(p.process(&Value::text("  10  "), &ctx()).unwrap(), Value::Int64(10));
        assert_eq!(p.process(&Value::text("-3"), &ctx()).unwrap(), Value::Int64(-3));
    }

    #[test]
    fn integer_error_names_raw_value() {
        let p = IntegerProcessor::new();
        let dt = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let cases = [
            (Value::Float64(10.1), "10.1 is not an integer."),
            (Value::text("Not integer"), "Not integer is not an integer."),
            (Value::DateTime(dt), "2020-01-01 00:00:00 is not an integer."),
        ];
        for (input, message) in cases {
            assert_eq!(p.process(&input, &ctx()).unwrap_err().message, message);
        }
    }

    #[test]
    fn float_accepts_comma_separator() {
        let p = FloatProcessor::new();
        assert_eq!(p.process(&Value::Int64(10), &ctx()).unwrap(), Value::Float64(10.0));
        assert_eq!(p.process(&Value::text("10.123"), &ctx()).unwrap(), Value::Float64(10.123));
        assert_eq!(
            p.process(&Value::text("    123,22  \n"), &ctx()).unwrap(),
            Value::Float64(123.22)
        );
    }

    #[test]
    fn float_rejects_garbage_and_non_finite() {
        let p = FloatProcessor::new();
        assert_eq!(
            p.process(&Value::text("10.1.1"), &ctx()).unwrap_err().message,
            "10.1.1 is not a floating point number."
        );
        assert!(p.process(&Value::text("inf"), &ctx()).is_err());
        assert!(p.process(&Value::Bool(true), &ctx()).is_err());
    }

    #[test]
    fn decimal_keeps_written_scale() {
        let p = DecimalProcessor::new();
        assert_eq!(
            p.process(&Value::text(" 12,50 "), &ctx()).unwrap(),
            Value::Decimal(Decimal::new(1250, 2))
        );
        assert_eq!(p.process(&Value::text("1.5e2"), &ctx()).unwrap(), Value::Decimal(Decimal::new(150, 0)));
        assert_eq!(p.process(&Value::Int64(7), &ctx()).unwrap(), Value::Decimal(Decimal::new(7, 0)));
        assert_eq!(p.process(&Value::Float64(2.5), &ctx()).unwrap(), Value::Decimal(Decimal::new(25, 1)));
        assert_eq!(p.process(&Value::Null, &ctx()).unwrap(), Value::Null);
    }

    #[test]
    fn decimal_rejects_non_numbers() {
        let p = DecimalProcessor::new().required();
        assert_eq!(
            p.process(&Value::text("12.5.1"), &ctx()).unwrap_err().message,
            "12.5.1 is not a decimal number."
        );
        assert!(p.process(&Value::Float64(f64::NAN), &ctx()).is_err());
        assert!(p.process(&Value::Bool(true), &ctx()).is_err());
        assert_eq!(p.process(&Value::text(""), &ctx()).unwrap_err().message, "value is required");
    }

    #[test]
    fn boolean_defaults() {
        let p = BooleanProcessor::new();
        assert_eq!(p.process(&Value::text("True"), &ctx()).unwrap(), Value::Bool(true));
        assert_eq!(p.process(&Value::Int64(0), &ctx()).unwrap(), Value::Bool(false));
        assert_eq!(p.process(&Value::Float64(1.0), &ctx()).unwrap(), Value::Bool(true));
        assert_eq!(p.process(&Value::Bool(false), &ctx()).unwrap(), Value::Bool(false));
        assert_eq!(p.process(&Value::Null, &ctx()).unwrap(), Value::Null);
    }

    #[test]
    fn boolean_custom_values_error_lists_expected() {
        let p = BooleanProcessor::new().with_values(["Yes"], ["No"]);
        assert_eq!(p.process(&Value::text("yes"), &ctx()).unwrap(), Value::Bool(true));
        let err = p.process(&Value::text("I do not know."), &ctx()).unwrap_err();
        assert_eq!(err.message, r#"Expected one of the values: ["Yes", "No"]"#);
    }
}
