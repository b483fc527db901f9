//! Local departure time to UTC conversion
//!
//! The backend's routing calls need the departure instant in UTC. The server
//! conversion endpoint is preferred; when it is unavailable for any reason the
//! instant is computed locally instead. Conversion never fails, and the result
//! records which path produced it so the user can see it.

mod departure;

pub use departure::DepartureSelection;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Serialize, Serializer};

use crate::api::{ConvertTimeRequest, MatrixBackend};

/// Outcome of a local-to-UTC conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtcConversion {
    #[serde(serialize_with = "serialize_iso")]
    pub utc_time: DateTime<Utc>,
    pub unix_timestamp: i64,
    pub used_server_conversion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_active: Option<bool>,
}

impl UtcConversion {
    /// ISO-8601 with milliseconds and a `Z` suffix, e.g. 2025-03-25T17:30:00.000Z
    pub fn utc_time_iso(&self) -> String {
        self.utc_time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// UTC calendar date, "YYYY-MM-DD"
    pub fn departure_date(&self) -> String {
        self.utc_time.format("%Y-%m-%d").to_string()
    }

    /// UTC time of day, "HH:MM:SS"
    pub fn departure_time(&self) -> String {
        self.utc_time.format("%H:%M:%S").to_string()
    }

    /// Human label for the path that produced this result
    pub fn source_label(&self) -> &'static str {
        if self.used_server_conversion {
            "Time API (Server)"
        } else {
            "Client-side Fallback"
        }
    }
}

fn serialize_iso<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Client-side conversion: the instant is already absolute, so this is a
/// matter of reading it in UTC. Unix seconds are epoch millis / 1000, floored.
pub fn to_utc_unix<Tz: TimeZone>(local: &DateTime<Tz>) -> UtcConversion {
    let utc_time = local.with_timezone(&Utc);
    UtcConversion {
        unix_timestamp: utc_time.timestamp_millis().div_euclid(1000),
        utc_time,
        used_server_conversion: false,
        dst_active: None,
    }
}

/// Convert a departure selection to UTC, preferring the server.
///
/// Any failure of the server path (network, non-2xx, timeout, missing
/// endpoint, unreadable payload) falls back to [`to_utc_unix`].
pub async fn convert_to_utc(
    backend: &dyn MatrixBackend,
    selection: &DepartureSelection,
) -> UtcConversion {
    let request = ConvertTimeRequest {
        local_time: selection.wall_clock(),
        from_time_zone: Some(selection.zone_name().to_string()),
    };

    match backend.convert_time(&request).await {
        Ok(data) => match parse_server_utc(&data.utc_time) {
            Some(utc_time) => {
                log::info!(
                    "Server converted {} ({}) to {}",
                    request.local_time,
                    selection.zone_name(),
                    data.utc_time
                );
                UtcConversion {
                    utc_time,
                    unix_timestamp: data.unix_timestamp,
                    used_server_conversion: true,
                    dst_active: data.dst_active,
                }
            }
            None => {
                log::warn!(
                    "Server returned an unreadable utcTime '{}', using client-side conversion",
                    data.utc_time
                );
                to_utc_unix(selection.local())
            }
        },
        Err(e) => {
            log::warn!("Time conversion endpoint failed ({}), using client-side conversion", e);
            to_utc_unix(selection.local())
        }
    }
}

/// Accept RFC 3339 or a naive ISO timestamp (read as UTC)
fn parse_server_utc(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
