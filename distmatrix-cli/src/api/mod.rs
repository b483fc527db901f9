//! Distance matrix backend API
//!
//! Thin HTTP plumbing around the four endpoints the backend exposes: health,
//! time conversion, matrix upload and result download. The matrix itself is
//! computed remotely; this module only ships requests and classifies failures.

pub mod client;
pub mod endpoints;
pub mod models;

pub use client::MatrixClient;
pub use models::{ConvertTimeData, ConvertTimeRequest, ErrorBody, MatrixResult, UploadForm};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::AppError;

/// The operations the client needs from a backend.
///
/// Implemented over HTTP by [`MatrixClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait MatrixBackend: Send + Sync {
    /// True if the backend answered its health check with 200
    async fn check_health(&self) -> bool;

    /// Server-side local-to-UTC conversion (optional capability)
    async fn convert_time(&self, request: &ConvertTimeRequest) -> Result<ConvertTimeData, AppError>;

    /// Upload a sheet and wait for the full matrix to be computed
    async fn upload_matrix(&self, form: UploadForm) -> Result<MatrixResult, AppError>;

    /// Fetch a result workbook by the name the upload returned
    async fn download_result(&self, filename: &str) -> Result<Vec<u8>, AppError>;
}

/// Map a non-success HTTP status (and its body, if any) onto the error taxonomy
pub fn classify_status(status: u16, body: &[u8]) -> AppError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed.message.filter(|m| !m.trim().is_empty());

    match status {
        401 => AppError::Auth { message },
        403 => AppError::Forbidden { message },
        404 => AppError::NotFound { message },
        400 | 422 => AppError::Validation {
            status,
            message: message.unwrap_or_else(|| "Invalid data provided.".to_string()),
            field_errors: field_errors(parsed.errors),
        },
        s if s >= 500 => AppError::Server { status, message },
        _ => AppError::Unknown(
            message.unwrap_or_else(|| format!("Server returned status {}", status)),
        ),
    }
}

fn field_errors(errors: Option<BTreeMap<String, Value>>) -> BTreeMap<String, String> {
    errors
        .unwrap_or_default()
        .into_iter()
        .map(|(field, reason)| {
            let text = match reason {
                Value::String(s) => s,
                Value::Array(items) => items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect::<Vec<_>>()
                    .join("; "),
                other => other.to_string(),
            };
            (field, text)
        })
        .collect()
}
