//! In-memory backend and fixtures shared by unit tests

use async_trait::async_trait;
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::api::{ConvertTimeData, ConvertTimeRequest, MatrixBackend, MatrixResult, UploadForm};
use crate::error::AppError;

/// Scripted [`MatrixBackend`] that records every call it receives
pub struct FakeBackend {
    healthy: bool,
    conversion: Result<ConvertTimeData, AppError>,
    upload: Result<MatrixResult, AppError>,
    upload_delay: Duration,
    download: Result<Vec<u8>, AppError>,
    conversion_requests: Mutex<Vec<ConvertTimeRequest>>,
    uploads: Mutex<Vec<UploadForm>>,
    calls: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            healthy: true,
            conversion: Err(AppError::NotFound { message: None }),
            upload: Ok(sample_result(16)),
            upload_delay: Duration::ZERO,
            download: Ok(b"PK\x03\x04result".to_vec()),
            conversion_requests: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeBackend {
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    pub fn with_conversion(mut self, conversion: Result<ConvertTimeData, AppError>) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn with_upload(mut self, upload: Result<MatrixResult, AppError>) -> Self {
        self.upload = upload;
        self
    }

    /// Make the upload take this long (use with a paused clock)
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    /// Total number of backend calls of any kind
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn conversion_requests(&self) -> Vec<ConvertTimeRequest> {
        self.conversion_requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<UploadForm> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MatrixBackend for FakeBackend {
    async fn check_health(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.healthy
    }

    async fn convert_time(&self, request: &ConvertTimeRequest) -> Result<ConvertTimeData, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.conversion_requests.lock().unwrap().push(request.clone());
        self.conversion.clone()
    }

    async fn upload_matrix(&self, form: UploadForm) -> Result<MatrixResult, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().unwrap().push(form);
        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        self.upload.clone()
    }

    async fn download_result(&self, _filename: &str) -> Result<Vec<u8>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.download.clone()
    }
}

pub fn sample_result(pairs: u64) -> MatrixResult {
    MatrixResult {
        message: "Distance matrix processed".to_string(),
        total_pairs_in_output: Some(pairs),
        result_filename: Some("distance_matrix_result.xlsx".to_string()),
        processing_time_seconds: Some(3.2),
        ..MatrixResult::default()
    }
}

/// Four San Francisco addresses mixing DRIVE and TELE, plus one TRANSIT row
/// when `with_transit` is set
pub fn sample_rows_xlsx(with_transit: bool) -> Vec<u8> {
    let rows = [
        ("SF001", "1 Market St, San Francisco, CA", "DRIVE"),
        ("SF002", "600 Montgomery St, San Francisco, CA", "DRIVE"),
        ("SF003", "1 Ferry Building, San Francisco, CA", if with_transit { "TRANSIT" } else { "DRIVE" }),
        ("SF004", "2 Marina Blvd, San Francisco, CA", "TELE"),
    ];

    let mut workbook = XlsxWorkbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Addresses").unwrap();
    for (col, header) in ["Address Code", "Address", "Transport Mode"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, (code, address, mode)) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, *code).unwrap();
        sheet.write_string(r, 1, *address).unwrap();
        sheet.write_string(r, 2, *mode).unwrap();
    }

    let notes = workbook.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "Address Code").unwrap();
    notes.write_string(0, 1, "Address").unwrap();
    notes.write_string(0, 2, "Transport Mode").unwrap();
    notes.write_string(1, 0, "NT001").unwrap();
    notes.write_string(1, 1, "Golden Gate Park, San Francisco, CA").unwrap();
    notes.write_string(1, 2, "TELE").unwrap();

    workbook.save_to_buffer().unwrap()
}
