//! Path-based entry points.
//!
//! [`parse_path`] picks a [`RowSource`] for one file and runs a [`Parser`] over it;
//! [`parse_files`] does the same for every file matched by a set of glob patterns, and
//! `parse_workbook` (feature `excel`) for every worksheet of one workbook.
//!
//! - If [`SourceOptions::format`] is `None`, the format is inferred from the file extension.
//! - Observers attached to the parser see one success/failure callback per file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{SourceError, SourceResult};
use crate::parser::{ParseResult, Parser};
use crate::types::CleanedRow;

use super::csv::{CsvOptions, CsvSource};
use super::source::RowSource;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values (or any dialect set through [`CsvOptions`]).
    Csv,
    /// Tab-separated values.
    Tsv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> SourceResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SourceError::Format {
                message: format!("cannot infer format: path has no extension ({})", path.display()),
            })?;

        Self::from_extension(ext).ok_or_else(|| SourceError::Format {
            message: format!(
                "cannot infer format from extension '{ext}' for path ({})",
                path.display()
            ),
        })
    }
}

/// How to choose the worksheet when reading a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelection {
    /// The first worksheet (default).
    #[default]
    First,
    /// Worksheet by position in workbook order.
    Index(usize),
    /// Worksheet by name.
    Name(String),
}

/// Options controlling how a path is turned into a row source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceOptions {
    /// If `None`, the format is inferred from the file extension.
    pub format: Option<IngestionFormat>,
    /// Dialect used for CSV files. TSV files always use a tab delimiter.
    pub csv: CsvOptions,
    /// Worksheet read from workbooks.
    pub sheet: SheetSelection,
}

/// Build the row source for `path`.
///
/// Fails only when the format cannot be determined (or workbook support is disabled); problems
/// reading the file itself surface when the source is opened.
pub fn source_from_path(path: impl AsRef<Path>, options: &SourceOptions) -> SourceResult<Box<dyn RowSource>> {
    let path = path.as_ref();
    let format = match options.format {
        Some(f) => f,
        None => IngestionFormat::from_path(path)?,
    };

    match format {
        IngestionFormat::Csv => Ok(Box::new(CsvSource::from_path(path).with_options(options.csv))),
        IngestionFormat::Tsv => Ok(Box::new(CsvSource::from_path(path).with_options(CsvOptions {
            delimiter: b'\t',
            ..options.csv
        }))),
        IngestionFormat::Excel => excel_source(path, &options.sheet),
    }
}

fn excel_source(path: &Path, sheet: &SheetSelection) -> SourceResult<Box<dyn RowSource>> {
    #[cfg(feature = "excel")]
    {
        Ok(Box::new(super::excel::ExcelSource::from_path(path).with_sheet(sheet.clone())))
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (path, sheet);
        Err(SourceError::Format {
            message: "excel support not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

/// Parse one file with `parser`, choosing the row source from `options`.
///
/// ```no_run
/// use tabular_import::ingestion::{parse_path, SourceOptions};
/// use tabular_import::parser::Parser;
/// use tabular_import::processors::IntegerProcessor;
/// use tabular_import::schema::{Column, Schema};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Schema::new(vec![Column::new("id", 0, IntegerProcessor::new().required()).header("ID")])?;
/// let mut parser = Parser::new(schema);
/// let result = parse_path("people.csv", &mut parser, &SourceOptions::default())?;
/// println!("rows={} errors={}", result.cleaned_data.len(), result.errors.len());
/// # Ok(())
/// # }
/// ```
pub fn parse_path<'p>(
    path: impl AsRef<Path>,
    parser: &'p mut Parser,
    options: &SourceOptions,
) -> SourceResult<&'p ParseResult> {
    let source = source_from_path(path, options)?;
    Ok(parser.parse(source.as_ref()))
}

/// Result of parsing one file in a batch.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: ParseResult,
}

/// Results of [`parse_files`], in sorted path order.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub files: Vec<FileOutcome>,
}

impl BatchResult {
    /// Cleaned rows of every file, concatenated in file order.
    pub fn cleaned_rows(&self) -> impl Iterator<Item = &CleanedRow> {
        self.files.iter().flat_map(|f| f.result.cleaned_data.iter())
    }

    /// Every error record rendered with its file path as a prefix.
    pub fn error_messages(&self) -> Vec<String> {
        self.files
            .iter()
            .flat_map(|f| {
                f.result
                    .errors
                    .iter()
                    .map(move |record| format!("{}, {record}", f.path.display()))
            })
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|f| f.result.has_errors())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Parse every file under `dir` matching any of `patterns`, one after another.
///
/// Each file gets a fresh clone of `parser`, so results never leak between files. Paths are
/// de-duplicated and processed in sorted order. A matched file whose format cannot be determined
/// gets an aborted outcome of its own; only an invalid pattern or an unreadable directory fails
/// the whole batch.
pub fn parse_files<I, S>(
    dir: impl AsRef<Path>,
    patterns: I,
    parser: &Parser,
    options: &SourceOptions,
) -> SourceResult<BatchResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let dir = dir.as_ref();
    let base = glob::Pattern::escape(&dir.to_string_lossy());

    let mut paths = BTreeSet::new();
    for pattern in patterns {
        let full = Path::new(&base).join(pattern.as_ref());
        let matches = glob::glob(&full.to_string_lossy()).map_err(|e| SourceError::Format {
            message: format!("invalid glob pattern '{}': {e}", pattern.as_ref()),
        })?;
        for entry in matches {
            let path = entry.map_err(|e| SourceError::Io(e.into_error()))?;
            if path.is_file() {
                paths.insert(path);
            }
        }
    }
    info!(dir = %dir.display(), files = paths.len(), "parsing matched files");

    let mut batch = BatchResult::default();
    for path in paths {
        let mut file_parser = parser.clone();
        match source_from_path(&path, options) {
            Ok(source) => {
                file_parser.parse(source.as_ref());
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "no row source for matched file");
                file_parser.parse_unavailable(path.display().to_string(), err);
            }
        }
        debug!(path = %path.display(), errors = file_parser.errors().len(), "file parsed");
        batch.files.push(FileOutcome {
            path,
            result: file_parser.into_result(),
        });
    }
    Ok(batch)
}

/// Result of parsing one worksheet.
#[derive(Debug, Clone)]
pub struct SheetOutcome {
    pub title: String,
    pub result: ParseResult,
}

/// Results of `parse_workbook`, in workbook order.
#[derive(Debug, Clone, Default)]
pub struct WorkbookResult {
    pub path: PathBuf,
    pub sheets: Vec<SheetOutcome>,
}

impl WorkbookResult {
    /// Cleaned rows of every sheet, each tagged with its worksheet title.
    pub fn cleaned_rows(&self) -> impl Iterator<Item = &CleanedRow> {
        self.sheets.iter().flat_map(|s| s.result.cleaned_data.iter())
    }

    /// Every error record rendered as `worksheet: <title>, <record>`.
    pub fn error_messages(&self) -> Vec<String> {
        self.sheets
            .iter()
            .flat_map(|s| {
                s.result
                    .errors
                    .iter()
                    .map(move |record| format!("worksheet: {}, {record}", s.title))
            })
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.sheets.iter().any(|s| s.result.has_errors())
    }

    pub fn sheet(&self, title: &str) -> Option<&ParseResult> {
        self.sheets.iter().find(|s| s.title == title).map(|s| &s.result)
    }
}

/// Parse every worksheet of the workbook at `path` with its own clone of `parser`.
///
/// A header mismatch or a read failure on one sheet ends only that sheet's run. Cleaned rows are
/// tagged with the worksheet title after the run, so row and file hooks see them untagged.
#[cfg(feature = "excel")]
pub fn parse_workbook(path: impl AsRef<Path>, parser: &Parser) -> SourceResult<WorkbookResult> {
    let path = path.as_ref();
    let titles = super::excel::sheet_names(path)?;
    info!(path = %path.display(), sheets = titles.len(), "parsing every worksheet");

    let mut workbook = WorkbookResult {
        path: path.to_path_buf(),
        sheets: Vec::with_capacity(titles.len()),
    };
    for title in titles {
        let source = super::excel::ExcelSource::from_path(path).with_sheet(SheetSelection::Name(title.clone()));
        let mut sheet_parser = parser.clone();
        sheet_parser.parse(&source);
        let mut result = sheet_parser.into_result();
        for row in &mut result.cleaned_data {
            row.worksheet = Some(title.clone());
        }
        debug!(worksheet = %title, errors = result.errors.len(), "worksheet parsed");
        workbook.sheets.push(SheetOutcome { title, result });
    }
    Ok(workbook)
}
