use std::fmt;
use std::sync::Arc;

use crate::error::ValidationError;
use crate::types::Value;

use super::{EmptyPolicy, Processor, RowContext, StringProcessor, empty_policy_builders};

/// Accepts only values from a fixed set, after coercing with an inner processor.
#[derive(Debug, Clone)]
pub struct ChoiceProcessor {
    allowed: Vec<Value>,
    inner: Arc<dyn Processor>,
}

impl ChoiceProcessor {
    /// Text choices; the cell is coerced with [`StringProcessor`] first.
    pub fn new<I>(allowed: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            inner: Arc::new(StringProcessor::new()),
        }
    }

    /// Coerce with `processor` before checking membership (e.g. integer codes).
    pub fn with_processor(mut self, processor: impl Processor + 'static) -> Self {
        self.inner = Arc::new(processor);
        self
    }
}

impl Processor for ChoiceProcessor {
    fn process(&self, value: &Value, ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        let coerced = self.inner.process(value, ctx)?;
        if coerced == Value::Null || self.allowed.contains(&coerced) {
            return Ok(coerced);
        }
        let allowed: Vec<String> = self.allowed.iter().map(ToString::to_string).collect();
        Err(ValidationError::new(format!(
            "{coerced} is not one of the allowed values: [{}]",
            allowed.join(", ")
        )))
    }
}

/// Ignores the cell and always yields the configured value.
#[derive(Debug, Clone)]
pub struct ConstantProcessor {
    value: Value,
}

impl ConstantProcessor {
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into() }
    }
}

impl Processor for ConstantProcessor {
    fn process(&self, _value: &Value, _ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        Ok(self.value.clone())
    }
}

/// Reads several source columns and coerces the first non-empty one.
///
/// The owning column's own cell is ignored; indices past the end of the row count as empty.
#[derive(Debug, Clone)]
pub struct FirstOfProcessor {
    indices: Vec<usize>,
    inner: Arc<dyn Processor>,
    empty: EmptyPolicy,
}

impl FirstOfProcessor {
    pub fn new(indices: impl IntoIterator<Item = usize>, processor: impl Processor + 'static) -> Self {
        Self {
            indices: indices.into_iter().collect(),
            inner: Arc::new(processor),
            empty: EmptyPolicy::default(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

empty_policy_builders!(FirstOfProcessor);

impl Processor for FirstOfProcessor {
    fn process(&self, _value: &Value, ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        let first = self
            .indices
            .iter()
            .filter_map(|&idx| ctx.cell(idx))
            .find(|cell| !cell.is_empty());
        match first {
            Some(cell) => self.empty.apply(cell, |v| self.inner.process(v, ctx)),
            None => self.empty.resolve(),
        }
    }
}

/// Runs processors in sequence, feeding each output into the next. Stops at the first failure.
#[derive(Debug, Clone, Default)]
pub struct ChainProcessor {
    steps: Vec<Arc<dyn Processor>>,
}

impl ChainProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, processor: impl Processor + 'static) -> Self {
        self.steps.push(Arc::new(processor));
        self
    }
}

impl Processor for ChainProcessor {
    fn process(&self, value: &Value, ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        self.steps
            .iter()
            .try_fold(value.clone(), |acc, step| step.process(&acc, ctx))
    }
}

/// What [`LenientProcessor`] yields when the inner processor fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// Keep the raw cell value unchanged.
    KeepRaw,
    /// Replace the value with `Null`.
    Null,
}

/// Swallows validation failures of the inner processor.
#[derive(Debug, Clone)]
pub struct LenientProcessor {
    inner: Arc<dyn Processor>,
    on_error: OnError,
}

impl LenientProcessor {
    pub fn new(processor: impl Processor + 'static, on_error: OnError) -> Self {
        Self {
            inner: Arc::new(processor),
            on_error,
        }
    }
}

impl Processor for LenientProcessor {
    fn process(&self, value: &Value, ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        match self.inner.process(value, ctx) {
            Ok(v) => Ok(v),
            Err(_) => Ok(match self.on_error {
                OnError::KeepRaw => value.clone(),
                OnError::Null => Value::Null,
            }),
        }
    }
}

type ProcessFn = dyn Fn(&Value, &RowContext<'_>) -> Result<Value, ValidationError> + Send + Sync;

/// Adapts a closure into a [`Processor`].
///
/// ```rust
/// use tabular_import::processors::{FnProcessor, Processor, RowContext};
/// use tabular_import::types::Value;
///
/// let upper = FnProcessor::new("upper", |v, _ctx| Ok(Value::text(v.to_string().to_uppercase())));
/// assert_eq!(upper.process(&Value::text("ab"), &RowContext::detached(1)).unwrap(), Value::text("AB"));
/// ```
#[derive(Clone)]
pub struct FnProcessor {
    name: String,
    func: Arc<ProcessFn>,
}

impl FnProcessor {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &RowContext<'_>) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for FnProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProcessor").field("name", &self.name).finish()
    }
}

impl Processor for FnProcessor {
    fn process(&self, value: &Value, ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        (self.func)(value, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::{IntegerProcessor, StringProcessor};

    fn ctx() -> RowContext<'static> {
        RowContext::detached(1)
    }

    #[test]
    fn choice_accepts_members_and_lists_allowed() {
        let p = ChoiceProcessor::new(["red", "green"]);
        assert_eq!(p.process(&Value::text(" red "), &ctx()).unwrap(), Value::text("red"));
        let err = p.process(&Value::text("blue"), &ctx()).unwrap_err();
        assert_eq!(err.message, "blue is not one of the allowed values: [red, green]");
    }

    #[test]
    fn choice_with_integer_codes() {
        let p = ChoiceProcessor::new([1_i64, 2]).with_processor(IntegerProcessor::new().required());
        assert_eq!(p.process(&Value::text("2"), &ctx()).unwrap(), Value::Int64(2));
        assert!(p.process(&Value::text("3"), &ctx()).is_err());
        assert!(p.process(&Value::Null, &ctx()).is_err());
    }

    #[test]
    fn constant_ignores_input() {
        let p = ConstantProcessor::new("import");
        assert_eq!(p.process(&Value::Int64(5), &ctx()).unwrap(), Value::text("import"));
        assert_eq!(p.process(&Value::Null, &ctx()).unwrap(), Value::text("import"));
    }

    #[test]
    fn first_of_picks_first_non_empty() {
        let cells = vec![Value::text(""), Value::text("  "), Value::text("7"), Value::text("9")];
        let row = RowContext::new(4, &cells);
        let p = FirstOfProcessor::new([0, 1, 2, 3], IntegerProcessor::new());
        assert_eq!(p.process(&Value::Null, &row).unwrap(), Value::Int64(7));
    }

    #[test]
    fn first_of_all_empty_follows_policy() {
        let cells = vec![Value::Null, Value::text("")];
        let row = RowContext::new(1, &cells);
        let p = FirstOfProcessor::new([0, 1, 5], StringProcessor::new());
        assert_eq!(p.process(&Value::Null, &row).unwrap(), Value::Null);
        assert!(p.clone().required().process(&Value::Null, &row).is_err());
    }

    #[test]
    fn chain_pipes_values_and_stops_on_error() {
        let lower = FnProcessor::new("lower", |v, _| Ok(Value::text(v.to_string().to_lowercase())));
        let p = ChainProcessor::new().then(StringProcessor::new()).then(lower);
        assert_eq!(p.process(&Value::text(" Test strIng  "), &ctx()).unwrap(), Value::text("test string"));

        let failing = ChainProcessor::new()
            .then(FnProcessor::new("fail", |_, _| Err(ValidationError::new("invalid_value"))))
            .then(FnProcessor::new("unreachable", |_, _| panic!("must not run")));
        assert_eq!(failing.process(&Value::text("x"), &ctx()).unwrap_err().message, "invalid_value");
    }

    #[test]
    fn lenient_keeps_raw_or_nulls() {
        let keep = LenientProcessor::new(IntegerProcessor::new(), OnError::KeepRaw);
        assert_eq!(keep.process(&Value::text("abc"), &ctx()).unwrap(), Value::text("abc"));
        let null = LenientProcessor::new(IntegerProcessor::new(), OnError::Null);
        assert_eq!(null.process(&Value::text("abc"), &ctx()).unwrap(), Value::Null);
        assert_eq!(null.process(&Value::text("4"), &ctx()).unwrap(), Value::Int64(4));
    }
}
