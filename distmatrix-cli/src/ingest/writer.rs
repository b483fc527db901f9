//! Re-encode an ingested table as an xlsx workbook for upload

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::Value;

use super::Table;
use crate::error::AppError;

/// Name of the single worksheet in a re-encoded upload
const SHEET_NAME: &str = "Data";

/// Write the table to an in-memory xlsx file: header row first, then one row per record
pub fn encode_xlsx(table: &Table) -> Result<Vec<u8>, AppError> {
    write_table(table).map_err(|e| {
        log::error!("Failed to encode '{}' as xlsx: {}", table.sheet, e);
        AppError::Unknown(format!("Error preparing file for upload: {}", e))
    })
}

fn write_table(table: &Table) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (row_idx, record) in table.rows.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        for (col, header) in table.headers.iter().enumerate() {
            if let Some(value) = record.get(header) {
                write_value(worksheet, row, col as u16, value)?;
            }
        }
    }

    workbook.save_to_buffer()
}

fn write_value(ws: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), XlsxError> {
    match value {
        Value::Null => { /* Leave cell empty */ }
        Value::String(s) => { ws.write_string(row, col, s)?; }
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                ws.write_number(row, col, f)?;
            }
        }
        Value::Bool(b) => { ws.write_boolean(row, col, *b)?; }
        Value::Array(_) | Value::Object(_) => { ws.write_string(row, col, value.to_string())?; }
    }
    Ok(())
}
