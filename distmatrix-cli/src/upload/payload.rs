//! Multipart payload construction

use chrono::Utc;

use crate::api::UploadForm;
use crate::error::AppError;
use crate::ingest::{SourceFile, Table, XLSX_MIME, encode_xlsx};
use crate::timeconv::{DepartureSelection, UtcConversion, to_utc_unix};

/// Name used when the selected rows are re-encoded instead of sent as-is
pub const REENCODED_FILE_NAME: &str = "data.xlsx";

/// Everything captured when processing begins
#[derive(Debug, Clone)]
pub struct Submission {
    pub source: SourceFile,
    pub table: Table,
    /// Whether `table` came from the workbook's first worksheet
    pub first_sheet: bool,
    pub departure: Option<DepartureSelection>,
    pub conversion: Option<UtcConversion>,
}

impl Submission {
    /// Backend pair estimate: every address against every address
    pub fn estimated_pairs(&self) -> u64 {
        let rows = self.table.len() as u64;
        rows * rows
    }

    /// The original bytes are only meaningful when the backend would read the
    /// same rows from them: a native workbook whose first sheet was selected
    pub fn reuses_source(&self) -> bool {
        self.source.is_native_workbook() && self.first_sheet
    }

    fn resolved_conversion(&self) -> Option<UtcConversion> {
        self.conversion
            .clone()
            .or_else(|| self.departure.as_ref().map(|d| to_utc_unix(d.local())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadPayload {
    pub form: UploadForm,
    pub reused_source: bool,
}

impl UploadPayload {
    /// Build the upload form for a submission.
    ///
    /// `timestamp` is attached only when the sheet has transit rows, and such
    /// sheets fail with [`AppError::MissingDepartureTime`] if no departure was
    /// chosen. No I/O happens here.
    pub fn build(submission: &Submission) -> Result<Self, AppError> {
        let conversion = submission.resolved_conversion();
        let transit = submission.table.has_transit_rows();

        let timestamp = if transit {
            let conversion = conversion.as_ref().ok_or(AppError::MissingDepartureTime)?;
            Some(conversion.unix_timestamp)
        } else {
            None
        };

        let (departure_date, departure_time) = match &conversion {
            Some(c) => (c.departure_date(), c.departure_time()),
            None => {
                let now = Utc::now();
                log::debug!("No departure selected, sending current UTC time {}", now);
                (
                    now.format("%Y-%m-%d").to_string(),
                    now.format("%H:%M:%S").to_string(),
                )
            }
        };

        let reused_source = submission.reuses_source();
        let (file_name, file_bytes, mime_type) = if reused_source {
            (
                submission.source.name.clone(),
                submission.source.bytes.clone(),
                submission.source.mime_type().to_string(),
            )
        } else {
            (
                REENCODED_FILE_NAME.to_string(),
                encode_xlsx(&submission.table)?,
                XLSX_MIME.to_string(),
            )
        };

        log::debug!(
            "Upload payload: {} ({}), {} rows, transit={}",
            file_name,
            if reused_source { "original bytes" } else { "re-encoded" },
            submission.table.len(),
            transit
        );

        Ok(Self {
            form: UploadForm {
                file_name,
                file_bytes,
                mime_type,
                departure_date,
                departure_time,
                timestamp,
            },
            reused_source,
        })
    }
}
