//! The row source abstraction consumed by the parser.

use crate::error::SourceResult;
use crate::types::Value;

/// Lazy, forward-only sequence of raw rows. Dropping it releases the underlying file.
pub type RowSequence<'a> = Box<dyn Iterator<Item = SourceResult<Vec<Value>>> + 'a>;

/// Something that can be opened into a [`RowSequence`].
///
/// Every call to [`RowSource::open`] starts from the first row again, which is what lets a parser
/// be re-run against the same source.
pub trait RowSource {
    /// Open the source. Fails when the locator is missing, unreadable or malformed.
    fn open(&self) -> SourceResult<RowSequence<'_>>;

    /// Short human-readable locator used in logs and error messages.
    fn describe(&self) -> String;
}

impl<S: RowSource + ?Sized> RowSource for &S {
    fn open(&self) -> SourceResult<RowSequence<'_>> {
        (**self).open()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn open(&self) -> SourceResult<RowSequence<'_>> {
        (**self).open()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Rows already held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySource {
    name: String,
    rows: Vec<Vec<Value>>,
}

impl MemorySource {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: "memory".to_string(),
            rows,
        }
    }

    /// Build a source from rows of text cells.
    pub fn from_text<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(|c| Value::Utf8(c.into())).collect())
                .collect(),
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

impl RowSource for MemorySource {
    fn open(&self) -> SourceResult<RowSequence<'_>> {
        Ok(Box::new(self.rows.iter().cloned().map(Ok)))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reopens_from_start() {
        let src = MemorySource::from_text([vec!["a", "b"], vec!["1", "2"]]);
        let first: Vec<_> = src.open().unwrap().map(Result::unwrap).collect();
        let second: Vec<_> = src.open().unwrap().map(Result::unwrap).collect();
        assert_eq!(first, second);
        assert_eq!(first[1], vec![Value::text("1"), Value::text("2")]);
    }
}
