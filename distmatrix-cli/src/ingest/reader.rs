//! Workbook parsing and positional-to-header remapping

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto_from_rs};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Cursor;

use super::validate::validate_file;
use super::{Row, SourceFile, Table};
use crate::config::IngestLimits;
use crate::error::AppError;

/// Sheet name given to the single sheet of a CSV upload
const CSV_SHEET_NAME: &str = "Sheet1";

/// One record keyed by column letter, in column order
type PositionalRecord = Vec<(String, Value)>;

/// In-memory handle to an uploaded workbook.
///
/// Owns the parsed workbook so that worksheets can be re-selected without
/// re-reading the file. Replaced wholesale on every new upload.
pub struct Workbook {
    source: SourceFile,
    sheet_names: Vec<String>,
    inner: WorkbookInner,
}

enum WorkbookInner {
    Spreadsheet(Sheets<Cursor<Vec<u8>>>),
    Csv(Vec<Vec<Data>>),
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            WorkbookInner::Spreadsheet(_) => "spreadsheet",
            WorkbookInner::Csv(_) => "csv",
        };
        f.debug_struct("Workbook")
            .field("file", &self.source.name)
            .field("kind", &kind)
            .field("sheet_names", &self.sheet_names)
            .finish()
    }
}

impl Workbook {
    /// Validate the file against the limits and parse it
    pub fn open(source: SourceFile, limits: &IngestLimits) -> Result<Self, AppError> {
        validate_file(&source.name, source.size(), limits)?;

        if source.extension().as_deref() == Some(".csv") {
            let records = parse_csv(&source.bytes)?;
            return Ok(Self {
                source,
                sheet_names: vec![CSV_SHEET_NAME.to_string()],
                inner: WorkbookInner::Csv(records),
            });
        }

        let sheets = open_workbook_auto_from_rs(Cursor::new(source.bytes.clone()))?;
        let sheet_names = sheets.sheet_names();
        if sheet_names.is_empty() {
            return Err(AppError::unsupported_file(
                "The Excel file is empty or could not be parsed",
            ));
        }

        log::debug!("Opened '{}' with sheets {:?}", source.name, sheet_names);

        Ok(Self {
            source,
            sheet_names,
            inner: WorkbookInner::Spreadsheet(sheets),
        })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    /// Whether `name` is the first worksheet (the one the backend reads by default)
    pub fn is_first_sheet(&self, name: &str) -> bool {
        self.sheet_names.first().map(|s| s == name).unwrap_or(false)
    }

    /// Parse one worksheet into header-keyed rows
    pub fn read_sheet(&mut self, name: &str) -> Result<Table, AppError> {
        if !self.sheet_names.iter().any(|s| s == name) {
            return Err(AppError::unsupported_file(format!(
                "Worksheet \"{}\" does not exist. Available: {}",
                name,
                self.sheet_names.join(", ")
            )));
        }

        let records = match &mut self.inner {
            WorkbookInner::Spreadsheet(sheets) => {
                let range = sheets.worksheet_range(name)?;
                range_records(&range)
            }
            WorkbookInner::Csv(rows) => {
                positional_records(rows.iter().map(|r| r.as_slice()), 0)
            }
        };

        build_table(name, records)
    }
}

/// Column letter for a zero-based column index (0 -> A, 25 -> Z, 26 -> AA)
pub fn column_letter(index: u32) -> String {
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn range_records(range: &Range<Data>) -> Vec<PositionalRecord> {
    let first_col = range.start().map(|(_, col)| col).unwrap_or(0);
    positional_records(range.rows(), first_col)
}

/// Key every cell by its absolute column letter.
///
/// The first record is always kept (it is the header row even when blank);
/// later records made only of empty cells are skipped.
fn positional_records<'a>(
    rows: impl Iterator<Item = &'a [Data]>,
    first_col: u32,
) -> Vec<PositionalRecord> {
    let mut records = Vec::new();

    for row in rows {
        let record: PositionalRecord = row
            .iter()
            .enumerate()
            .map(|(offset, cell)| (column_letter(first_col + offset as u32), cell_to_value(cell)))
            .collect();

        let blank = record.iter().all(|(_, v)| v.is_null());
        if blank && !records.is_empty() {
            continue;
        }
        records.push(record);
    }

    records
}

/// Turn positional records into a header-keyed table using the first record as headers
fn build_table(sheet: &str, records: Vec<PositionalRecord>) -> Result<Table, AppError> {
    let mut records = records.into_iter();
    let empty = || AppError::EmptySheet {
        sheet: sheet.to_string(),
    };

    let header_record = records.next().ok_or_else(empty)?;

    let mut header_map: HashMap<String, String> = HashMap::new();
    let mut headers: Vec<String> = Vec::new();
    for (col, value) in header_record {
        if let Some(text) = header_text(&value) {
            if !headers.contains(&text) {
                headers.push(text.clone());
            }
            header_map.insert(col, text);
        }
    }

    if header_map.is_empty() {
        return Err(empty());
    }

    let rows: Vec<Row> = records
        .map(|record| {
            let mut row: Row = headers.iter().map(|h| (h.clone(), Value::Null)).collect();
            for (col, value) in record {
                // Columns without a header are dropped
                if let Some(header) = header_map.get(&col) {
                    row.insert(header.clone(), value);
                }
            }
            row
        })
        .collect();

    Ok(Table {
        sheet: sheet.to_string(),
        headers,
        rows,
    })
}

/// Header text for a header cell, `None` for null or empty cells.
/// Text is kept exactly as written, spaces included.
fn header_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Convert a cell to a raw scalar (numbers stay numbers, dates stay serials)
fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => json!(*i),
        Data::Float(f) => float_value(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => float_value(dt.as_f64()),
        Data::DateTimeIso(s) => Value::String(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

fn float_value(f: f64) -> Value {
    // Whole numbers are stored as integers so "7" doesn't become "7.0"
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        json!(f as i64)
    } else {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Parse CSV bytes into cells, inferring numbers the way spreadsheet apps do
fn parse_csv(bytes: &[u8]) -> Result<Vec<Vec<Data>>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            log::debug!("CSV parse error: {}", e);
            AppError::unsupported_file("Failed to parse the CSV file. Please make sure it is valid UTF-8 CSV.")
        })?;

        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Data::Empty
                } else if let Ok(i) = field.parse::<i64>() {
                    Data::Int(i)
                } else if let Some(f) = field.parse::<f64>().ok().filter(|f| f.is_finite()) {
                    Data::Float(f)
                } else {
                    Data::String(field.to_string())
                }
            })
            .collect();
        rows.push(cells);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ingest::{encode_xlsx, ingest};
    use rust_xlsxwriter::Workbook as XlsxWorkbook;

    fn sample_xlsx() -> Vec<u8> {
        let mut workbook = XlsxWorkbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name("Addresses").unwrap();
        sheet.write_string(0, 0, "Address Code").unwrap();
        sheet.write_string(0, 1, "Address").unwrap();
        sheet.write_string(0, 2, "Transport Mode").unwrap();
        // Column D has data but no header
        sheet.write_string(1, 3, "ignored").unwrap();
        let data = [
            ("SF001", "1315 Ellis Street, San Francisco, California 94115", "DRIVE"),
            ("SF002", "1329 7th Avenue, San Francisco, California 94122", "DRIVE"),
            ("SF003", "27 Fountain St, San Francisco, California 94114", "TRANSIT"),
        ];
        for (i, (code, address, mode)) in data.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, *code).unwrap();
            sheet.write_string(row, 1, *address).unwrap();
            sheet.write_string(row, 2, *mode).unwrap();
        }

        let second = workbook.add_worksheet();
        second.set_name("Offsets").unwrap();
        // Starts at C3 so the positional keys are not A/B
        second.write_string(2, 2, " Padded Header ").unwrap();
        second.write_number(2, 3, 2025.0).unwrap();
        second.write_number(3, 2, 1.5).unwrap();
        second.write_number(3, 3, 42.0).unwrap();

        workbook.add_worksheet().set_name("Empty").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    fn open(bytes: Vec<u8>, name: &str) -> Workbook {
        Workbook::open(SourceFile::new(name, bytes), &IngestLimits::default()).unwrap()
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_rows_are_keyed_by_header_text() {
        let ingested = ingest(
            SourceFile::new("addresses.xlsx", sample_xlsx()),
            &IngestLimits::default(),
        )
        .unwrap();

        assert_eq!(
            ingested.workbook.sheet_names(),
            &["Addresses", "Offsets", "Empty"]
        );

        let table = ingested.table;
        assert_eq!(table.sheet, "Addresses");
        assert_eq!(table.headers, vec!["Address Code", "Address", "Transport Mode"]);
        // 4 records, minus the header row
        assert_eq!(table.len(), 3);
        for row in &table.rows {
            let keys: Vec<&String> = row.keys().collect();
            assert_eq!(keys.len(), 3);
            assert!(!row.contains_key("D"));
            assert!(!row.contains_key("ignored"));
        }
        assert_eq!(table.rows[0]["Address Code"], json!("SF001"));
        assert_eq!(table.rows[2]["Transport Mode"], json!("TRANSIT"));
        assert!(table.has_transit_rows());
        assert!(table.missing_required_columns().is_empty());
    }

    #[test]
    fn test_reselect_sheet_preserves_header_spacing() {
        let mut workbook = open(sample_xlsx(), "addresses.xlsx");
        assert!(workbook.is_first_sheet("Addresses"));
        assert!(!workbook.is_first_sheet("Offsets"));

        let table = workbook.read_sheet("Offsets").unwrap();
        assert_eq!(table.headers, vec![" Padded Header ", "2025"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][" Padded Header "], json!(1.5));
        assert_eq!(table.rows[0]["2025"], json!(42));
    }

    #[test]
    fn test_empty_sheet_is_rejected() {
        let mut workbook = open(sample_xlsx(), "addresses.xlsx");
        let err = workbook.read_sheet("Empty").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptySheet);
        assert_eq!(
            err.to_string(),
            "The worksheet \"Empty\" is empty or could not be parsed"
        );
    }

    #[test]
    fn test_unknown_sheet_is_rejected() {
        let mut workbook = open(sample_xlsx(), "addresses.xlsx");
        let err = workbook.read_sheet("Nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFile);
    }

    #[test]
    fn test_blank_header_record_is_empty_sheet() {
        let records = vec![
            vec![("A".to_string(), Value::Null), ("B".to_string(), Value::Null)],
            vec![("A".to_string(), json!("SF001")), ("B".to_string(), json!("x"))],
        ];
        let err = build_table("Sheet1", records).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptySheet);

        assert_eq!(
            build_table("Sheet1", Vec::new()).unwrap_err().kind(),
            ErrorKind::EmptySheet
        );
    }

    #[test]
    fn test_header_only_sheet_has_no_rows() {
        let records = vec![vec![("A".to_string(), json!("Address Code"))]];
        let table = build_table("Sheet1", records).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers, vec!["Address Code"]);
    }

    #[test]
    fn test_csv_ingest() {
        let csv = "Address Code,Address,Transport Mode,\n\
                   SF001,\"1315 Ellis Street, San Francisco\",DRIVE,x\n\
                   ,,,\n\
                   SF004,123 Main St,tele\n";
        let ingested = ingest(
            SourceFile::new("addresses.csv", csv.as_bytes().to_vec()),
            &IngestLimits::default(),
        )
        .unwrap();

        assert_eq!(ingested.workbook.sheet_names(), &["Sheet1"]);
        let table = ingested.table;
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0]["Address"],
            json!("1315 Ellis Street, San Francisco")
        );
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.rows[1]["Transport Mode"], json!("tele"));
        assert!(!table.has_transit_rows());
    }

    #[test]
    fn test_csv_numbers_are_inferred() {
        let csv = "Code,Weight\n7,1.25\n";
        let table = ingest(
            SourceFile::new("n.csv", csv.as_bytes().to_vec()),
            &IngestLimits::default(),
        )
        .unwrap()
        .table;
        assert_eq!(table.rows[0]["Code"], json!(7));
        assert_eq!(table.rows[0]["Weight"], json!(1.25));
    }

    #[test]
    fn test_garbage_bytes_are_unsupported() {
        let err = Workbook::open(
            SourceFile::new("broken.xlsx", b"definitely not a zip".to_vec()),
            &IngestLimits::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFile);
    }

    #[test]
    fn test_reencoded_table_reads_back_identically() {
        let original = ingest(
            SourceFile::new("addresses.xlsx", sample_xlsx()),
            &IngestLimits::default(),
        )
        .unwrap()
        .table;

        let bytes = encode_xlsx(&original).unwrap();
        let reread = ingest(SourceFile::new("data.xlsx", bytes), &IngestLimits::default())
            .unwrap()
            .table;

        assert_eq!(reread.sheet, "Data");
        assert_eq!(reread.headers, original.headers);
        assert_eq!(reread.rows, original.rows);
    }
}
