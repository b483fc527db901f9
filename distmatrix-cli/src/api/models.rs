//! Wire types for the backend API

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Successful responses wrap their payload in `{ "data": ... }`
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error bodies: `{ "message": "...", "errors": { "field": "reason" } }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<BTreeMap<String, Value>>,
}

/// POST /convert-time request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertTimeRequest {
    /// Local wall-clock time, "YYYY-MM-DD HH:MM:SS"
    pub local_time: String,
    /// IANA zone name the local time belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_time_zone: Option<String>,
}

/// POST /convert-time payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertTimeData {
    pub utc_time: String,
    pub unix_timestamp: i64,
    #[serde(default)]
    pub dst_active: Option<bool>,
}

/// Multipart content for POST /upload-distance-matrix
#[derive(Debug, Clone, PartialEq)]
pub struct UploadForm {
    pub file_name: String,
    pub file_bytes: Vec<u8>,
    pub mime_type: String,
    /// UTC date, "YYYY-MM-DD"
    pub departure_date: String,
    /// UTC time of day, "HH:MM:SS"
    pub departure_time: String,
    /// UTC unix seconds, only sent for sheets with transit rows
    pub timestamp: Option<i64>,
}

/// POST /upload-distance-matrix payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixResult {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pairs_in_output: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pairs: Option<u64>,
    #[serde(default)]
    pub result_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_batch_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_pair_errors: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size_used: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<Vec<Value>>,
}

impl MatrixResult {
    /// Number of computed pairs, whichever field the backend filled in
    pub fn total_pairs(&self) -> u64 {
        self.total_pairs_in_output.or(self.total_pairs).unwrap_or(0)
    }
}
