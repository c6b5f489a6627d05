#![cfg(feature = "excel")]

//! Workbook row source (`.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`) backed by `calamine`.

use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{SourceError, SourceResult};
use crate::types::Value;

use super::source::{RowSequence, RowSource};
use super::unified::SheetSelection;

/// Reads one worksheet, preserving native cell types.
///
/// Numbers stay numbers, booleans stay booleans and date cells become [`Value::DateTime`], so
/// processors see the same values a spreadsheet user sees.
#[derive(Debug, Clone)]
pub struct ExcelSource {
    path: PathBuf,
    sheet: SheetSelection,
}

impl ExcelSource {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sheet: SheetSelection::default(),
        }
    }

    pub fn with_sheet(mut self, sheet: SheetSelection) -> Self {
        self.sheet = sheet;
        self
    }

    fn read_range(&self) -> SourceResult<Range<Data>> {
        let mut workbook = open_workbook_auto(&self.path)?;
        let names = workbook.sheet_names().to_vec();
        let name = match &self.sheet {
            SheetSelection::First => names.first().cloned(),
            SheetSelection::Index(i) => names.get(*i).cloned(),
            SheetSelection::Name(n) => names.iter().find(|s| *s == n).cloned(),
        }
        .ok_or_else(|| SourceError::Format {
            message: format!(
                "sheet {:?} not found in workbook {} (sheets={names:?})",
                self.sheet,
                self.path.display()
            ),
        })?;
        Ok(workbook.worksheet_range(&name)?)
    }
}

impl RowSource for ExcelSource {
    fn open(&self) -> SourceResult<RowSequence<'_>> {
        // calamine loads the whole sheet; rows are converted lazily from the owned range.
        let range = self.read_range()?;
        Ok(Box::new(absolute_rows(&range).into_iter().map(Ok)))
    }

    fn describe(&self) -> String {
        match &self.sheet {
            SheetSelection::Name(name) => format!("{} [{name}]", self.path.display()),
            _ => self.path.display().to_string(),
        }
    }
}

/// Worksheet titles in workbook order.
pub fn sheet_names(path: impl AsRef<Path>) -> SourceResult<Vec<String>> {
    let workbook = open_workbook_auto(path.as_ref())?;
    Ok(workbook.sheet_names().to_vec())
}

/// Rows addressed from A1.
///
/// calamine trims leading empty rows and columns off the used range, so both are padded back:
/// column indices and `skip_rows` then refer to the physical sheet layout.
fn absolute_rows(range: &Range<Data>) -> Vec<Vec<Value>> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };
    let mut rows: Vec<Vec<Value>> = (0..first_row).map(|_| Vec::new()).collect();
    rows.extend(range.rows().map(|row| {
        std::iter::repeat_n(Value::Null, first_col as usize)
            .chain(row.iter().map(convert_cell))
            .collect::<Vec<_>>()
    }));
    rows
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(Value::DateTime)
            .unwrap_or(Value::Float64(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso(s).unwrap_or_else(|| Value::Utf8(s.clone())),
        Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(e) => Value::Utf8(format!("{e:?}")),
    }
}

/// Convert an Excel serial date (days since 1899-12-30, fraction = time of day).
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn parse_iso(s: &str) -> Option<Value> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Value::DateTime(dt));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Value::Date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_dates_convert() {
        let dt = excel_serial_to_datetime(43831.5).unwrap();
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
        );
        assert!(excel_serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn native_cells_keep_types() {
        assert_eq!(convert_cell(&Data::Empty), Value::Null);
        assert_eq!(convert_cell(&Data::Float(25.0)), Value::Float64(25.0));
        assert_eq!(convert_cell(&Data::Bool(true)), Value::Bool(true));
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2020-01-31".to_string())),
            Value::Date(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap())
        );
    }

    #[test]
    fn used_range_is_padded_back_to_a1() {
        let mut range = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("Name".to_string()));
        range.set_value((2, 2), Data::Int(25));

        let rows = absolute_rows(&range);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_empty());
        assert_eq!(rows[1], vec![Value::Null, Value::text("Name"), Value::Null]);
        assert_eq!(rows[2], vec![Value::Null, Value::Null, Value::Int64(25)]);
    }

    #[test]
    fn empty_sheet_has_no_rows() {
        assert!(absolute_rows(&Range::<Data>::empty()).is_empty());
    }

    #[test]
    fn missing_workbook_fails_to_open() {
        assert!(ExcelSource::from_path("tests/fixtures/nope.xlsx").open().is_err());
    }
}
