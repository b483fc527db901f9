//! Error taxonomy shared by the ingestor, the backend client and the workflow
//!
//! Every failure the client can hit resolves to one of these variants. The
//! `Display` text is what the user sees, so server-provided messages win over
//! the generic wording whenever the backend supplied one.

use std::collections::BTreeMap;
use thiserror::Error;

/// Broad classification of an [`AppError`], used to pick follow-up hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Server,
    Validation,
    Auth,
    Forbidden,
    NotFound,
    UnsupportedFile,
    EmptySheet,
    MissingDepartureTime,
    Unknown,
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// No response was received at all
    #[error("Network error. Check your connection and try again.")]
    Network { detail: String },

    /// The request ran over its time budget
    #[error("Request timed out. Try a smaller file or try again.")]
    Timeout,

    /// 5xx from the backend
    #[error("{}", .message.as_deref().unwrap_or("An unexpected server error occurred. Please try again later."))]
    Server { status: u16, message: Option<String> },

    /// 400 / 422, optionally carrying per-field messages
    #[error("{message}")]
    Validation {
        status: u16,
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    #[error("{}", .message.as_deref().unwrap_or("Authentication required. Please log in again."))]
    Auth { message: Option<String> },

    #[error("{}", .message.as_deref().unwrap_or("You do not have permission to perform this action."))]
    Forbidden { message: Option<String> },

    #[error("{}", .message.as_deref().unwrap_or("The requested resource was not found."))]
    NotFound { message: Option<String> },

    /// Bad spreadsheet content, extension or size
    #[error("{0}")]
    UnsupportedFile(String),

    #[error("The worksheet \"{sheet}\" is empty or could not be parsed")]
    EmptySheet { sheet: String },

    #[error("A departure time is required when the sheet contains TRANSIT rows.")]
    MissingDepartureTime,

    #[error("{0}")]
    Unknown(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Network { .. } => ErrorKind::Network,
            AppError::Timeout => ErrorKind::Timeout,
            AppError::Server { .. } => ErrorKind::Server,
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::Auth { .. } => ErrorKind::Auth,
            AppError::Forbidden { .. } => ErrorKind::Forbidden,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::UnsupportedFile(_) => ErrorKind::UnsupportedFile,
            AppError::EmptySheet { .. } => ErrorKind::EmptySheet,
            AppError::MissingDepartureTime => ErrorKind::MissingDepartureTime,
            AppError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// HTTP status attached to the error, if it came from a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AppError::Server { status, .. } | AppError::Validation { status, .. } => Some(*status),
            AppError::Auth { .. } => Some(401),
            AppError::Forbidden { .. } => Some(403),
            AppError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn unsupported_file(message: impl Into<String>) -> Self {
        AppError::UnsupportedFile(message.into())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout
        } else if err.is_connect() || err.is_request() {
            AppError::Network {
                detail: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            crate::api::classify_status(status.as_u16(), &[])
        } else {
            AppError::Unknown(err.to_string())
        }
    }
}

impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        log::debug!("Spreadsheet codec error: {}", err);
        AppError::UnsupportedFile(
            "Failed to parse the Excel file. Please make sure it is a valid XLSX file.".to_string(),
        )
    }
}
