//! Per-cell coercion and validation rules.
//!
//! A [`Processor`] turns one raw cell into a cleaned [`Value`] or fails with a
//! [`ValidationError`]. Processors hold only construction-time configuration, so one instance can
//! be shared by any number of columns and parser runs.
//!
//! Built-in processors:
//!
//! - [`RawProcessor`], [`StringProcessor`], [`EmailProcessor`], [`NoneSymbolsProcessor`],
//!   [`ListProcessor`] (text)
//! - [`IntegerProcessor`], [`FloatProcessor`], [`DecimalProcessor`], [`BooleanProcessor`]
//!   (numeric/bool)
//! - [`DateProcessor`], [`DateTimeProcessor`] (calendar)
//! - [`ChoiceProcessor`], [`ConstantProcessor`], [`FirstOfProcessor`], [`ChainProcessor`],
//!   [`LenientProcessor`], [`FnProcessor`] (combinators)
//!
//! ## Empty cells
//!
//! Every value-coercing processor carries an [`EmptyPolicy`]: for an empty or whitespace-only
//! cell it either fails (required, no default), substitutes its default, or yields
//! [`Value::Null`].
//!
//! ```rust
//! use tabular_import::processors::{IntegerProcessor, Processor, RowContext};
//! use tabular_import::types::Value;
//!
//! let ctx = RowContext::detached(1);
//! let age = IntegerProcessor::new().required();
//! assert_eq!(age.process(&Value::text(" 25 "), &ctx).unwrap(), Value::Int64(25));
//! assert!(age.process(&Value::text(""), &ctx).is_err());
//!
//! let score = IntegerProcessor::new().with_default(0_i64);
//! assert_eq!(score.process(&Value::Null, &ctx).unwrap(), Value::Int64(0));
//! ```

mod combinators;
mod numeric;
mod temporal;
mod text;

use std::fmt;

use crate::error::ValidationError;
use crate::types::Value;

pub use combinators::{
    ChainProcessor, ChoiceProcessor, ConstantProcessor, FirstOfProcessor, FnProcessor, LenientProcessor,
    OnError,
};
pub use numeric::{BooleanProcessor, DecimalProcessor, FloatProcessor, IntegerProcessor};
pub use temporal::{DateProcessor, DateTimeProcessor};
pub use text::{EmailProcessor, ListProcessor, NoneSymbolsProcessor, RawProcessor, StringProcessor};

/// Read-only view of the row a cell belongs to.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    /// 1-based data row index.
    pub row_index: usize,
    /// All raw cells of the row, in source order.
    pub cells: &'a [Value],
}

impl<'a> RowContext<'a> {
    pub fn new(row_index: usize, cells: &'a [Value]) -> Self {
        Self { row_index, cells }
    }

    /// A context with no sibling cells, for calling processors outside the parser.
    pub fn detached(row_index: usize) -> RowContext<'static> {
        RowContext { row_index, cells: &[] }
    }

    /// Raw cell at `index`, if the row is long enough.
    pub fn cell(&self, index: usize) -> Option<&'a Value> {
        self.cells.get(index)
    }
}

/// Coercion + validation rule for one cell.
pub trait Processor: Send + Sync + fmt::Debug {
    /// Convert `value` into its cleaned form.
    fn process(&self, value: &Value, ctx: &RowContext<'_>) -> Result<Value, ValidationError>;
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn process(&self, value: &Value, ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        (**self).process(value, ctx)
    }
}

impl<P: Processor + ?Sized> Processor for std::sync::Arc<P> {
    fn process(&self, value: &Value, ctx: &RowContext<'_>) -> Result<Value, ValidationError> {
        (**self).process(value, ctx)
    }
}

/// What a processor does with an empty cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmptyPolicy {
    /// Fail when the cell is empty and no default is configured.
    pub required: bool,
    /// Substituted for empty cells.
    pub default: Option<Value>,
}

impl EmptyPolicy {
    /// Resolve an empty cell.
    pub fn resolve(&self) -> Result<Value, ValidationError> {
        match (&self.default, self.required) {
            (Some(default), _) => Ok(default.clone()),
            (None, true) => Err(ValidationError::new("value is required")),
            (None, false) => Ok(Value::Null),
        }
    }

    /// Run `coerce` for non-empty values and [`Self::resolve`] otherwise.
    ///
    /// A coercion that yields `Null` (e.g. whitespace-only text) is treated as empty too.
    pub fn apply<F>(&self, value: &Value, coerce: F) -> Result<Value, ValidationError>
    where
        F: FnOnce(&Value) -> Result<Value, ValidationError>,
    {
        if value.is_empty() {
            return self.resolve();
        }
        match coerce(value)? {
            Value::Null => self.resolve(),
            out => Ok(out),
        }
    }
}

/// Builder methods shared by every processor carrying an [`EmptyPolicy`].
macro_rules! empty_policy_builders {
    ($ty:ty) => {
        impl $ty {
            /// Fail on empty cells unless a default is set.
            pub fn required(mut self) -> Self {
                self.empty.required = true;
                self
            }

            /// Substitute `default` for empty cells.
            pub fn with_default(mut self, default: impl Into<$crate::types::Value>) -> Self {
                self.empty.default = Some(default.into());
                self
            }

            /// The configured empty-cell policy.
            pub fn empty_policy(&self) -> &$crate::processors::EmptyPolicy {
                &self.empty
            }
        }
    };
}

pub(crate) use empty_policy_builders;
