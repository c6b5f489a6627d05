#![cfg(feature = "excel_test_writer")]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;

use tabular_import::ingestion::{parse_path, parse_workbook, ExcelSource, SheetSelection, SourceOptions};
use tabular_import::parser::{Parser, ParserOptions};
use tabular_import::processors::{BooleanProcessor, DateProcessor, FloatProcessor, IntegerProcessor, StringProcessor};
use tabular_import::report::ErrorKind;
use tabular_import::schema::{Column, Schema};
use tabular_import::types::Value;

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabular-import-{name}-{nanos}.xlsx"))
}

fn staff_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", 0, IntegerProcessor::new().required()).header("ID"),
        Column::new("name", 1, StringProcessor::new().required()).header("Name"),
        Column::new("score", 2, FloatProcessor::new()).header("Score"),
        Column::new("active", 3, BooleanProcessor::new()).header("Active"),
        Column::new("hired", 4, DateProcessor::new(["%Y-%m-%d"])).header("Hired"),
    ])
    .unwrap()
}

fn write_staff_xlsx(path: &PathBuf) {
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    let mut wb = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let ws = wb.add_worksheet();
    ws.set_name("Staff").unwrap();
    for (col, label) in ["ID", "Name", "Score", "Active", "Hired"].iter().enumerate() {
        ws.write_string(0, col as u16, *label).unwrap();
    }

    // native cells
    ws.write_number(1, 0, 1).unwrap();
    ws.write_string(1, 1, "Ada").unwrap();
    ws.write_number(1, 2, 98.5).unwrap();
    ws.write_boolean(1, 3, true).unwrap();
    let hired = ExcelDateTime::from_ymd(2020, 1, 31).unwrap();
    ws.write_datetime_with_format(1, 4, &hired, &date_format).unwrap();

    // numbers stored as text
    ws.write_string(2, 0, "2").unwrap();
    ws.write_string(2, 1, "Grace").unwrap();
    ws.write_string(2, 2, "87,25").unwrap();
    ws.write_string(2, 3, "no").unwrap();
    ws.write_string(2, 4, "2019-06-01").unwrap();

    // blank row 4 left empty on purpose

    ws.write_number(4, 0, 3.5).unwrap();
    ws.write_string(4, 1, "Linus").unwrap();

    let second = wb.add_worksheet();
    second.set_name("Archive").unwrap();
    for (col, label) in ["ID", "Name", "Score", "Active", "Hired"].iter().enumerate() {
        second.write_string(0, col as u16, *label).unwrap();
    }
    second.write_number(1, 0, 9).unwrap();
    second.write_string(1, 1, "Old").unwrap();

    wb.save(path).unwrap();
}

#[test]
fn native_and_text_cells_are_coerced_alike() {
    let path = tmp_file("staff");
    write_staff_xlsx(&path);

    let mut parser = Parser::new(staff_schema());
    let result = parse_path(&path, &mut parser, &SourceOptions::default()).unwrap();

    assert_eq!(result.cleaned_data.len(), 2);
    let ada = &result.cleaned_data[0];
    assert_eq!(ada.get("id"), Some(&Value::Int64(1)));
    assert_eq!(ada.get("active"), Some(&Value::Bool(true)));
    assert_eq!(
        ada.get("hired"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()))
    );

    let grace = &result.cleaned_data[1];
    assert_eq!(grace.get("id"), Some(&Value::Int64(2)));
    assert_eq!(grace.get("score"), Some(&Value::Float64(87.25)));
    assert_eq!(grace.get("active"), Some(&Value::Bool(false)));

    // the blank row between Grace and Linus is skipped, so Linus is data row 3
    let record = &result.errors.as_slice()[0];
    assert_eq!(record.row_index, Some(3));
    assert_eq!(record.column.as_deref(), Some("id"));
    assert_eq!(record.message, "3.5 is not an integer.");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn sheet_can_be_selected_by_name_or_index() {
    let path = tmp_file("sheets");
    write_staff_xlsx(&path);

    let mut parser = Parser::new(staff_schema());
    let by_name = parser
        .parse(&ExcelSource::from_path(&path).with_sheet(SheetSelection::Name("Archive".to_string())))
        .clone();
    let by_index = parser
        .parse(&ExcelSource::from_path(&path).with_sheet(SheetSelection::Index(1)))
        .clone();

    assert_eq!(by_name, by_index);
    assert_eq!(by_name.cleaned_data.len(), 1);
    assert_eq!(by_name.cleaned_data[0].get("name"), Some(&Value::text("Old")));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn unknown_sheet_is_a_source_error() {
    let path = tmp_file("nosheet");
    write_staff_xlsx(&path);

    let mut parser = Parser::new(staff_schema());
    let result = parser.parse(&ExcelSource::from_path(&path).with_sheet(SheetSelection::Name("Missing".to_string())));

    assert!(result.aborted);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors.as_slice()[0].kind, ErrorKind::Source);
    assert!(result.errors.as_slice()[0].message.contains("Missing"));

    let _ = std::fs::remove_file(&path);
}

fn name_age_schema(name_at: usize) -> Schema {
    Schema::new(vec![
        Column::new("name", name_at, StringProcessor::new().required()).header("Name"),
        Column::new("age", name_at + 1, IntegerProcessor::new().required()).header("Age"),
    ])
    .unwrap()
}

#[test]
fn column_indices_count_from_column_a() {
    use rust_xlsxwriter::Workbook;

    let path = tmp_file("offset-columns");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 1, "Name").unwrap();
    ws.write_string(0, 2, "Age").unwrap();
    ws.write_string(1, 1, "Ivan").unwrap();
    ws.write_number(1, 2, 25).unwrap();
    wb.save(&path).unwrap();

    let mut parser = Parser::new(name_age_schema(1));
    let result = parse_path(&path, &mut parser, &SourceOptions::default()).unwrap();

    assert!(!result.has_errors(), "{:?}", result.errors);
    assert_eq!(result.cleaned_data.len(), 1);
    assert_eq!(result.cleaned_data[0].get("name"), Some(&Value::text("Ivan")));
    assert_eq!(result.cleaned_data[0].get("age"), Some(&Value::Int64(25)));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn skip_rows_counts_leading_blank_sheet_rows() {
    use rust_xlsxwriter::Workbook;

    let path = tmp_file("offset-rows");
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    // row 1 left empty
    ws.write_string(1, 0, "Exported by crm").unwrap();
    ws.write_string(2, 0, "Name").unwrap();
    ws.write_string(2, 1, "Age").unwrap();
    ws.write_string(3, 0, "Ivan").unwrap();
    ws.write_number(3, 1, 25).unwrap();
    ws.write_string(4, 0, "Total").unwrap();
    ws.write_string(4, 1, "1 person").unwrap();
    wb.save(&path).unwrap();

    let mut parser = Parser::new(name_age_schema(0)).with_options(ParserOptions {
        skip_rows: 2,
        last_row: Some(4),
        ..ParserOptions::default()
    });
    let result = parse_path(&path, &mut parser, &SourceOptions::default()).unwrap();

    assert!(!result.has_errors(), "{:?}", result.errors);
    assert_eq!(result.cleaned_data.len(), 1);
    assert_eq!(result.cleaned_data[0].get("age"), Some(&Value::Int64(25)));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn every_worksheet_is_parsed_and_tagged() {
    use rust_xlsxwriter::Workbook;

    let path = tmp_file("all-sheets");
    let mut wb = Workbook::new();
    let march = wb.add_worksheet();
    march.set_name("March").unwrap();
    march.write_string(0, 0, "Name").unwrap();
    march.write_string(0, 1, "Age").unwrap();
    march.write_string(1, 0, "Ivan").unwrap();
    march.write_number(1, 1, 25).unwrap();
    march.write_string(2, 0, "Petr").unwrap();
    march.write_string(2, 1, "old").unwrap();

    let broken = wb.add_worksheet();
    broken.set_name("Notes").unwrap();
    broken.write_string(0, 0, "Remarks").unwrap();

    let april = wb.add_worksheet();
    april.set_name("April").unwrap();
    april.write_string(0, 0, "Name").unwrap();
    april.write_string(0, 1, "Age").unwrap();
    april.write_string(1, 0, "Anna").unwrap();
    april.write_number(1, 1, 31).unwrap();
    wb.save(&path).unwrap();

    let parser = Parser::new(name_age_schema(0)).with_options(ParserOptions {
        strict_headers: true,
        ..ParserOptions::default()
    });
    let workbook = parse_workbook(&path, &parser).unwrap();

    let titles: Vec<&str> = workbook.sheets.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["March", "Notes", "April"]);
    assert!(workbook.sheet("Notes").unwrap().aborted);

    let tagged: Vec<(Option<&str>, &Value)> = workbook
        .cleaned_rows()
        .map(|r| (r.worksheet.as_deref(), r.get("name").unwrap()))
        .collect();
    assert_eq!(
        tagged,
        vec![(Some("March"), &Value::text("Ivan")), (Some("April"), &Value::text("Anna"))]
    );

    let messages = workbook.error_messages();
    assert_eq!(messages[0], "worksheet: March, row: 2, column: age, old is not an integer.");
    assert!(messages[1].starts_with("worksheet: Notes, column: name, Expected header \"Name\""));

    let _ = std::fs::remove_file(&path);
}
