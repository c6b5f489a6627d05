//! CSV row source.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SourceResult;
use crate::types::Value;

use super::source::{RowSequence, RowSource};

/// Dialect options for delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter (default `,`).
    pub delimiter: u8,
    /// Quote character (default `"`).
    pub quote: u8,
    /// Trim whitespace around every field while reading.
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            trim: false,
        }
    }
}

impl CsvOptions {
    /// Tab-separated values.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        // Header handling belongs to the parser, so every line is yielded as a row.
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .trim(if self.trim { csv::Trim::All } else { csv::Trim::None });
        builder
    }
}

#[derive(Debug, Clone)]
enum CsvInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Reads delimited text from a file or an in-memory buffer. Every cell is yielded as text.
///
/// The csv reader skips empty lines; they are yielded here as empty rows so that row positions
/// (and `skip_rows`) follow the physical lines of the file.
///
/// ```rust
/// use tabular_import::ingestion::{CsvSource, RowSource};
/// use tabular_import::types::Value;
///
/// let src = CsvSource::from_bytes("id,name\n1,Ada\n");
/// let rows: Vec<_> = src.open().unwrap().collect::<Result<_, _>>().unwrap();
/// assert_eq!(rows[1], vec![Value::text("1"), Value::text("Ada")]);
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    input: CsvInput,
    options: CsvOptions,
}

impl CsvSource {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            input: CsvInput::Path(path.as_ref().to_path_buf()),
            options: CsvOptions::default(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            input: CsvInput::Bytes(bytes.into()),
            options: CsvOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }
}

impl RowSource for CsvSource {
    fn open(&self) -> SourceResult<RowSequence<'_>> {
        let builder = self.options.reader_builder();
        let rows: RowSequence<'_> = match &self.input {
            CsvInput::Path(path) => {
                let bytes = std::fs::read(path)?;
                Box::new(PhysicalRows::new(builder.from_reader(Cursor::new(bytes))))
            }
            CsvInput::Bytes(bytes) => Box::new(PhysicalRows::new(builder.from_reader(Cursor::new(bytes.as_slice())))),
        };
        Ok(rows)
    }

    fn describe(&self) -> String {
        match &self.input {
            CsvInput::Path(path) => path.display().to_string(),
            CsvInput::Bytes(_) => "csv buffer".to_string(),
        }
    }
}

/// Records of an in-memory reader, with the empty lines between them restored.
struct PhysicalRows<B> {
    reader: csv::Reader<Cursor<B>>,
    record: csv::StringRecord,
    blank_lines: usize,
    pending: Option<Vec<Value>>,
    done: bool,
}

impl<B: AsRef<[u8]>> PhysicalRows<B> {
    fn new(reader: csv::Reader<Cursor<B>>) -> Self {
        Self {
            reader,
            record: csv::StringRecord::new(),
            blank_lines: 0,
            pending: None,
            done: false,
        }
    }
}

impl<B: AsRef<[u8]>> Iterator for PhysicalRows<B> {
    type Item = SourceResult<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.blank_lines > 0 {
            self.blank_lines -= 1;
            return Some(Ok(Vec::new()));
        }
        if let Some(row) = self.pending.take() {
            return Some(Ok(row));
        }
        if self.done {
            return None;
        }

        let from = self.reader.position().byte() as usize;
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let row: Vec<Value> = self.record.iter().map(|cell| Value::Utf8(cell.to_owned())).collect();
                let bytes: &[u8] = self.reader.get_ref().get_ref().as_ref();
                let blanks = blank_lines_at(bytes, from);
                if blanks == 0 {
                    return Some(Ok(row));
                }
                self.blank_lines = blanks - 1;
                self.pending = Some(row);
                Some(Ok(Vec::new()))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err.into()))
            }
        }
    }
}

/// Number of empty lines starting at byte `from`, the end of the previous record.
fn blank_lines_at(bytes: &[u8], from: usize) -> usize {
    let from = from.min(bytes.len());
    let mut rest = &bytes[from..];
    let previous = from.checked_sub(1).map(|i| bytes[i]);
    // `\r\n` may be split across two reads
    if previous == Some(b'\r') {
        rest = rest.strip_prefix(b"\n").unwrap_or(rest);
    }

    let mut breaks = 0;
    while let Some((&byte, tail)) = rest.split_first() {
        match byte {
            b'\n' => rest = tail,
            b'\r' => rest = tail.strip_prefix(b"\n").unwrap_or(tail),
            _ => break,
        }
        breaks += 1;
    }

    let terminated = matches!(previous, None | Some(b'\n') | Some(b'\r'));
    if terminated { breaks } else { breaks.saturating_sub(1) }
}
