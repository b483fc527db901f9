//! Spreadsheet ingestion
//!
//! Turns an uploaded workbook (xlsx, xls, xlsb, ods or csv) into rows keyed by
//! the exact header text of the selected worksheet:
//!
//! - cells are first keyed positionally by column letter (A, B, ..., AA, ...)
//! - the first record becomes the header map (columns without a header are dropped)
//! - every following record is remapped from column letter to header text
//!
//! The ingestor has no side effects beyond returning data.

mod reader;
mod validate;
mod writer;

pub use reader::Workbook;
pub use writer::encode_xlsx;

use serde_json::{Map, Value};
use std::path::Path;

use crate::config::IngestLimits;
use crate::error::AppError;

/// Header names the backend expects, spelled exactly
pub mod columns {
    pub const ADDRESS_CODE: &str = "Address Code";
    pub const ADDRESS: &str = "Address";
    pub const TRANSPORT_MODE: &str = "Transport Mode";
    /// Alternate key some exports use for the transport mode
    pub const TRANSPORT_MODE_ALT: &str = "transport_mode";

    pub const REQUIRED: [&str; 3] = [ADDRESS_CODE, ADDRESS, TRANSPORT_MODE];
}

/// One record of the ingested sheet, keyed by header text
pub type Row = Map<String, Value>;

/// Raw uploaded file: original name plus bytes
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    /// Lower-cased extension including the dot, e.g. ".xlsx"
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(format!(".{}", ext.to_lowercase()))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the bytes are already in a workbook format the backend reads directly
    pub fn is_native_workbook(&self) -> bool {
        matches!(self.extension().as_deref(), Some(".xlsx") | Some(".xls"))
    }

    /// MIME type matching the extension
    pub fn mime_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some(".xlsx") => XLSX_MIME,
            Some(".xls") => "application/vnd.ms-excel",
            Some(".csv") => "text/csv",
            _ => "application/octet-stream",
        }
    }
}

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Rows of one worksheet plus the header order they were read with
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub sheet: String,
    /// Non-empty header cells in column order (duplicates collapsed)
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True if any row's transport mode is "transit" (case-insensitive)
    pub fn has_transit_rows(&self) -> bool {
        has_transit_rows(&self.rows)
    }

    /// Required headers that this sheet does not carry
    pub fn missing_required_columns(&self) -> Vec<&'static str> {
        columns::REQUIRED
            .iter()
            .copied()
            .filter(|required| !self.headers.iter().any(|h| h == required))
            .collect()
    }
}

/// True if any row's transport mode is "transit" (case-insensitive)
pub fn has_transit_rows(rows: &[Row]) -> bool {
    rows.iter().any(|row| {
        let mode = row
            .get(columns::TRANSPORT_MODE)
            .filter(|v| !v.is_null())
            .or_else(|| row.get(columns::TRANSPORT_MODE_ALT));
        match mode {
            Some(Value::String(s)) => s.eq_ignore_ascii_case("transit"),
            _ => false,
        }
    })
}

/// Result of a successful ingest: the workbook handle and the first sheet's rows
#[derive(Debug)]
pub struct Ingested {
    pub workbook: Workbook,
    pub table: Table,
}

/// Validate, parse and read the first worksheet of an uploaded file
pub fn ingest(source: SourceFile, limits: &IngestLimits) -> Result<Ingested, AppError> {
    let mut workbook = Workbook::open(source, limits)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::unsupported_file("The Excel file is empty or could not be parsed"))?;
    let table = workbook.read_sheet(&first)?;

    log::info!(
        "Ingested '{}': sheet '{}' with {} rows and headers {:?}",
        workbook.source().name,
        table.sheet,
        table.len(),
        table.headers
    );

    Ok(Ingested { workbook, table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_extension_and_mime() {
        let file = SourceFile::new("Addresses.XLSX", vec![]);
        assert_eq!(file.extension().as_deref(), Some(".xlsx"));
        assert!(file.is_native_workbook());
        assert_eq!(file.mime_type(), XLSX_MIME);

        let csv = SourceFile::new("addresses.csv", vec![]);
        assert!(!csv.is_native_workbook());
        assert_eq!(csv.mime_type(), "text/csv");

        assert_eq!(SourceFile::new("README", vec![]).extension(), None);
        assert_eq!(SourceFile::new("trailing.", vec![]).extension(), None);
    }

    #[test]
    fn test_has_transit_rows_is_case_insensitive() {
        for mode in ["Transit", "TRANSIT", "transit"] {
            let rows = vec![
                row(&[("Transport Mode", json!("DRIVE"))]),
                row(&[("Transport Mode", json!(mode))]),
            ];
            assert!(has_transit_rows(&rows), "{mode} should count as transit");
        }

        let rows = vec![
            row(&[("Transport Mode", json!("DRIVE"))]),
            row(&[("Transport Mode", json!("TELE"))]),
            row(&[("Transport Mode", Value::Null)]),
        ];
        assert!(!has_transit_rows(&rows));
    }

    #[test]
    fn test_has_transit_rows_alternate_key() {
        let rows = vec![row(&[("transport_mode", json!("transit"))])];
        assert!(has_transit_rows(&rows));
    }

    #[test]
    fn test_missing_required_columns() {
        let table = Table {
            sheet: "Sheet1".into(),
            headers: vec!["Address Code".into(), "Address".into()],
            rows: vec![],
        };
        assert_eq!(table.missing_required_columns(), vec!["Transport Mode"]);
    }
}
