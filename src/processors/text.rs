use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::types::Value;

use super::{EmptyPolicy, Processor, RowContext, empty_policy_builders};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9!#$%&'*+/=?^_`{|}~.-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}$")
        .expect("email pattern is valid")
});

/// Passes values through, trimming text. Whitespace-only text becomes `Null`.
#[derive(Debug, Clone, Default)]
pub struct RawProcessor {
    empty: EmptyPolicy,
}

impl RawProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

empty_policy_builders!(RawProcessor);

impl Processor for RawProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty.apply(value, |v| {
            Ok(match v {
                Value::Utf8(s) => Value::Utf8(s.trim().to_owned()),
                other => other.clone(),
            })
        })
    }
}

/// Coerces any value to trimmed text.
///
/// Numbers and dates are rendered with their display form (`123.1`, `2019-01-01`).
#[derive(Debug, Clone, Default)]
pub struct StringProcessor {
    empty: EmptyPolicy,
}

impl StringProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

empty_policy_builders!(StringProcessor);

impl Processor for StringProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty.apply(value, |v| Ok(to_trimmed_text(v)))
    }
}

fn to_trimmed_text(v: &Value) -> Value {
    let s = match v {
        Value::Utf8(s) => s.trim().to_owned(),
        other => other.to_string().trim().to_owned(),
    };
    if s.is_empty() { Value::Null } else { Value::Utf8(s) }
}

/// Lowercased, pattern-checked e-mail address.
#[derive(Debug, Clone, Default)]
pub struct EmailProcessor {
    empty: EmptyPolicy,
}

impl EmailProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

empty_policy_builders!(EmailProcessor);

impl Processor for EmailProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty.apply(value, |v| {
            let raw = match v {
                Value::Utf8(s) => s.trim().to_lowercase(),
                _ => return Err(invalid_email(v)),
            };
            if EMAIL_RE.is_match(&raw) {
                Ok(Value::Utf8(raw))
            } else {
                Err(invalid_email(v))
            }
        })
    }
}

fn invalid_email(v: &Value) -> ValidationError {
    ValidationError::new(format!("{v} is not a valid email address."))
}

/// Treats text made up only of placeholder symbols (e.g. `-`, `_`, `.`) as empty.
///
/// Other values pass through untouched.
#[derive(Debug, Clone)]
pub struct NoneSymbolsProcessor {
    symbols: BTreeSet<char>,
}

impl NoneSymbolsProcessor {
    pub fn new(symbols: impl IntoIterator<Item = char>) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
        }
    }
}

impl Processor for NoneSymbolsProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        if let Value::Utf8(s) = value {
            if !self.symbols.is_empty()
                && s.chars()
                    .filter(|c| !c.is_whitespace())
                    .all(|c| self.symbols.contains(&c))
            {
                return Ok(Value::Null);
            }
        }
        Ok(value.clone())
    }
}

/// Splits delimited text into a [`Value::List`] of integers, floats or strings.
///
/// `"word_one,1,2.2,"` becomes `[Utf8("word_one"), Int64(1), Float64(2.2)]`; empty items
/// (trailing separators) are dropped.
#[derive(Debug, Clone)]
pub struct ListProcessor {
    separator: char,
    empty: EmptyPolicy,
}

impl Default for ListProcessor {
    fn default() -> Self {
        Self {
            separator: ',',
            empty: EmptyPolicy::default(),
        }
    }
}

impl ListProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }
}

empty_policy_builders!(ListProcessor);

impl Processor for ListProcessor {
    fn process(&self, value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.empty.apply(value, |v| {
            let text = match v {
                Value::Utf8(s) => s.clone(),
                Value::List(_) => return Ok(v.clone()),
                other => other.to_string(),
            };
            let items: Vec<Value> = text
                .split(self.separator)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(list_item)
                .collect();
            if items.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::List(items))
            }
        })
    }
}

fn list_item(item: &str) -> Value {
    if let Ok(i) = item.parse::<i64>() {
        return Value::Int64(i);
    }
    match item.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float64(f),
        _ => Value::Utf8(item.to_owned()),
    }
}
